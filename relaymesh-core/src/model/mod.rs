mod envelope;
mod ice;
mod payload;
mod peer;
mod room;

pub use envelope::{ENDPOINT_ANY, Envelope, EnvelopeError, EnvelopeType, Protocol};
pub use ice::IceServerConfig;
pub use payload::DirectPayload;
pub use peer::PeerId;
pub use room::RoomId;
