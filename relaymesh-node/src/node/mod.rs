mod admission;
mod context;
mod node;
mod node_behavior;
mod node_command;
mod node_config;
mod node_handle;
mod registry;
mod session;

pub use admission::*;
pub use context::*;
pub use node::*;
pub use node_behavior::*;
pub use node_command::*;
pub use node_config::*;
pub use node_handle::*;
pub use registry::*;
pub use session::*;
