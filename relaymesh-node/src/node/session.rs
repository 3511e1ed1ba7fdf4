use crate::transport::{ConnectionTag, DirectConnection, Role};
use relaymesh_core::{EnvelopeType, PeerId};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingLocalDescription,
    AwaitingAnswer,
    Negotiating,
    Connected,
}

/// One direct-connection attempt with a remote peer.
///
/// The session owns the connection until the data channel opens; after that
/// the registry shares it and the session only remains for teardown.
pub struct NegotiationSession {
    tag: ConnectionTag,
    role: Role,
    state: SessionState,
    connection: Arc<dyn DirectConnection>,
    started_at: Instant,
    remote_applied: bool,
    pending_remote: Vec<String>,
    local_sent: bool,
    pending_local: Vec<String>,
}

impl NegotiationSession {
    pub fn new(tag: ConnectionTag, role: Role, connection: Arc<dyn DirectConnection>) -> Self {
        Self {
            tag,
            role,
            state: SessionState::AwaitingLocalDescription,
            connection,
            started_at: Instant::now(),
            remote_applied: false,
            pending_remote: Vec::new(),
            local_sent: false,
            pending_local: Vec::new(),
        }
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.tag.peer_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn connection(&self) -> Arc<dyn DirectConnection> {
        self.connection.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    pub fn owns(&self, tag: &ConnectionTag) -> bool {
        self.tag == *tag
    }

    pub fn is_expired(&self, now: Instant, timeout: Duration) -> bool {
        !self.is_connected() && now.duration_since(self.started_at) >= timeout
    }

    pub fn awaits_answer(&self) -> bool {
        self.role == Role::Initiator && self.state == SessionState::AwaitingAnswer
    }

    /// Local description was produced. Returns the envelope type to send it
    /// as, or `None` if the session already moved past that point.
    pub fn local_description_ready(&mut self) -> Option<EnvelopeType> {
        if self.state != SessionState::AwaitingLocalDescription {
            return None;
        }
        let kind = match self.role {
            Role::Initiator => {
                self.state = SessionState::AwaitingAnswer;
                EnvelopeType::Offer
            }
            Role::Responder => {
                self.state = SessionState::Negotiating;
                EnvelopeType::Answer
            }
        };
        Some(kind)
    }

    /// The local description went out; returns candidates held back so the
    /// description is sent first.
    pub fn local_description_sent(&mut self) -> Vec<String> {
        self.local_sent = true;
        std::mem::take(&mut self.pending_local)
    }

    /// Returns the candidate if it can be sent right away.
    pub fn queue_local_candidate(&mut self, candidate: String) -> Option<String> {
        if self.local_sent {
            return Some(candidate);
        }
        self.pending_local.push(candidate);
        None
    }

    /// Remote description applied; returns candidates that arrived before it.
    pub fn remote_description_applied(&mut self) -> Vec<String> {
        self.remote_applied = true;
        if self.awaits_answer() {
            self.state = SessionState::Negotiating;
        }
        std::mem::take(&mut self.pending_remote)
    }

    /// Returns the candidate if it can be applied right away.
    pub fn accept_remote_candidate(&mut self, candidate: String) -> Option<String> {
        if self.remote_applied {
            return Some(candidate);
        }
        self.pending_remote.push(candidate);
        None
    }

    pub fn mark_connected(&mut self) {
        self.state = SessionState::Connected;
        self.pending_local.clear();
        self.pending_remote.clear();
    }
}
