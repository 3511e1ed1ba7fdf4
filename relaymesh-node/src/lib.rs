//! Room-scoped peer discovery and direct-connection negotiation.
//!
//! A [`Node`] listens to a relay through [`RelayLink`], answers room
//! announcements within its connection budget, runs the offer/answer/candidate
//! exchange with every admitted peer and hands open data channels to the
//! application's [`NodeBehavior`].

mod error;
mod node;
mod signaling;
mod transport;

pub use error::*;
pub use node::*;
pub use signaling::*;
pub use transport::*;

pub use relaymesh_core::{
    DirectPayload, ENDPOINT_ANY, Envelope, EnvelopeError, EnvelopeType, IceServerConfig, PeerId,
    Protocol, RoomId,
};
