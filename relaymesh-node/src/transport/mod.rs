mod connection_wrapper;
mod peer_connector;
mod transport_config;
mod transport_event;

pub use connection_wrapper::*;
pub use peer_connector::*;
pub use transport_config::*;
pub use transport_event::*;
