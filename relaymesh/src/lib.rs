pub use relaymesh_core::model::{PeerId, RoomId};

pub mod model {
    pub use relaymesh_core::model::*;
}

#[cfg(feature = "node")]
pub mod node {
    pub use relaymesh_node::*;
}
