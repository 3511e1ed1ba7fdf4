mod node_context;

pub use node_context::*;
