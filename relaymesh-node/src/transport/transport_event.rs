use bytes::Bytes;
use relaymesh_core::PeerId;
use std::fmt;

/// Identifies one direct connection attempt with a peer.
///
/// A peer can be renegotiated, so events from a replaced connection are told
/// apart by `serial`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionTag {
    pub peer_id: PeerId,
    pub serial: u64,
}

impl fmt::Display for ConnectionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.peer_id, self.serial)
    }
}

/// Notifications the connection library produces for the node loop.
#[derive(Debug)]
pub enum TransportEvent {
    /// Local session description is ready and already applied locally.
    LocalDescription(ConnectionTag, String),

    /// A local ICE candidate was gathered and must be trickled to the peer.
    LocalCandidate(ConnectionTag, String),

    /// The data channel is open and ready for writes.
    ChannelOpen(ConnectionTag),

    /// Bytes received over the data channel.
    Message(ConnectionTag, Bytes),

    /// Connection or data channel closed.
    Disconnected(ConnectionTag),

    /// The library failed to progress the negotiation.
    Failed(ConnectionTag, String),
}

impl TransportEvent {
    pub fn tag(&self) -> &ConnectionTag {
        match self {
            TransportEvent::LocalDescription(tag, _)
            | TransportEvent::LocalCandidate(tag, _)
            | TransportEvent::ChannelOpen(tag)
            | TransportEvent::Message(tag, _)
            | TransportEvent::Disconnected(tag)
            | TransportEvent::Failed(tag, _) => tag,
        }
    }
}
