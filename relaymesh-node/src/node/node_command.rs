use crate::transport::Role;
use relaymesh_core::{Envelope, PeerId};
use tokio::sync::oneshot;

/// Input of the node event loop other than transport events.
#[derive(Debug)]
pub enum NodeCommand {
    /// Envelope received from the relay.
    Envelope(Envelope),

    /// Announce ourselves to the room (`HANDLE_CONNECTION`).
    Announce,

    /// Report the current sessions.
    Inspect(oneshot::Sender<NodeSnapshot>),

    /// Close every connection and stop the loop.
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub peer_id: PeerId,
    pub role: Role,
    pub state: crate::node::SessionState,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSnapshot {
    pub sessions: Vec<SessionSnapshot>,
    /// Registry order.
    pub connected: Vec<PeerId>,
}

impl NodeSnapshot {
    pub fn session(&self, peer_id: &PeerId) -> Option<&SessionSnapshot> {
        self.sessions.iter().find(|s| s.peer_id == *peer_id)
    }
}
