use relaymesh_core::{EnvelopeError, PeerId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    /// Negotiation needs a room; the operation was skipped.
    #[error("no room configured, please provide a room code")]
    EmptyRoom,

    #[error("node event loop has stopped")]
    Stopped,

    #[error("peer {0} is not connected")]
    NotConnected(PeerId),

    #[error("failed to send to {peer_id}: {reason}")]
    Send { peer_id: PeerId, reason: String },

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid relay url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("failed to join relay: {0}")]
    Join(#[source] Box<tokio_tungstenite::tungstenite::Error>),

    #[error("relay rejected the join with HTTP status {0}")]
    Rejected(u16),
}

impl RelayError {
    /// Process exit code for a failed join. Never zero.
    pub fn exit_code(&self) -> i32 {
        match self {
            RelayError::InvalidUrl(_) => 2,
            RelayError::Join(_) | RelayError::Rejected(_) => 1,
        }
    }
}
