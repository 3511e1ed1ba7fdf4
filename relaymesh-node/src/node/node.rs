use crate::node::admission::{Admission, AdmissionController};
use crate::node::context::NodeContext;
use crate::node::node_behavior::NodeBehavior;
use crate::node::node_command::{NodeCommand, NodeSnapshot, SessionSnapshot};
use crate::node::node_config::NodeConfig;
use crate::node::node_handle::NodeHandle;
use crate::node::registry::ConnectionRegistry;
use crate::node::session::NegotiationSession;
use crate::signaling::SignalingOutput;
use crate::transport::{ConnectionTag, DirectConnection, PeerConnector, Role, TransportEvent};
use relaymesh_core::{DirectPayload, Envelope, EnvelopeType, PeerId};
use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

const TRANSPORT_QUEUE: usize = 256;

/// Event loop of one mesh node.
///
/// Owns the negotiation sessions and is the only writer of the connection
/// registry. Relay envelopes and application commands arrive on
/// `command_rx`; everything the connection library reports arrives on
/// `transport_rx`. Nothing else mutates negotiation state.
pub struct Node {
    config: NodeConfig,
    behavior: Box<dyn NodeBehavior>,
    connector: Arc<dyn PeerConnector>,
    signaling: Arc<dyn SignalingOutput>,
    admission: AdmissionController,
    sessions: HashMap<PeerId, NegotiationSession>,
    registry: Arc<ConnectionRegistry>,
    command_rx: mpsc::Receiver<NodeCommand>,
    transport_rx: mpsc::Receiver<TransportEvent>,
    transport_tx: mpsc::Sender<TransportEvent>,
    next_serial: u64,
}

impl Node {
    pub fn new(
        config: NodeConfig,
        behavior: Box<dyn NodeBehavior>,
        connector: Arc<dyn PeerConnector>,
        signaling: Arc<dyn SignalingOutput>,
        command_rx: mpsc::Receiver<NodeCommand>,
    ) -> Self {
        let (transport_tx, transport_rx) = mpsc::channel(TRANSPORT_QUEUE);

        Self {
            admission: AdmissionController::new(config.capacity),
            config,
            behavior,
            connector,
            signaling,
            sessions: HashMap::new(),
            registry: Arc::new(ConnectionRegistry::new()),
            command_rx,
            transport_rx,
            transport_tx,
            next_serial: 0,
        }
    }

    pub fn context(&self) -> NodeContext {
        NodeContext::new(self.config.peer_id.clone(), self.registry.clone())
    }

    /// Runs the loop on the current runtime and returns a handle to it.
    /// `command_tx` must be the sender paired with this node's `command_rx`.
    pub fn spawn(self, command_tx: mpsc::Sender<NodeCommand>) -> NodeHandle {
        let handle = NodeHandle::new(command_tx, self.context(), self.config.room.clone());
        tokio::spawn(self.run());
        handle
    }

    pub async fn run(mut self) {
        info!(
            "Node {} event loop started in room '{}'",
            self.config.peer_id, self.config.room
        );

        let mut sweep = tokio::time::interval(self.config.sweep_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    let Some(cmd) = cmd else {
                        info!("Command channel closed. Shutting down node.");
                        break;
                    };
                    if self.handle_command(cmd).await.is_break() {
                        break;
                    }
                }

                evt = self.transport_rx.recv() => {
                    match evt {
                        Some(e) => self.handle_transport_event(e).await,
                        None => {
                            warn!("Transport channel closed unexpectedly");
                            break;
                        }
                    }
                }

                _ = sweep.tick() => self.expire_stalled_sessions().await,
            }
        }

        self.close_all().await;
        info!("Node {} event loop finished", self.config.peer_id);
    }

    async fn handle_command(&mut self, cmd: NodeCommand) -> ControlFlow<()> {
        match cmd {
            NodeCommand::Envelope(envelope) => self.handle_envelope(envelope).await,
            NodeCommand::Announce => {
                info!("Announcing {} to room '{}'", self.config.peer_id, self.config.room);
                self.send_to_room(EnvelopeType::HandleConnection, None).await;
            }
            NodeCommand::Inspect(reply) => {
                let _ = reply.send(self.snapshot());
            }
            NodeCommand::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    async fn handle_envelope(&mut self, envelope: Envelope) {
        let me = &self.config.peer_id;

        match envelope.kind {
            EnvelopeType::HandleConnection | EnvelopeType::Offer | EnvelopeType::RejectConnection => {
                if !envelope.should_respond(me, &self.config.room) {
                    debug!("Ignoring {} from {}", envelope.kind, envelope.from);
                    return;
                }
                match envelope.kind {
                    EnvelopeType::HandleConnection => self.handle_connection_request(envelope).await,
                    EnvelopeType::Offer => self.handle_offer(envelope).await,
                    _ => self.handle_reject(envelope).await,
                }
            }

            // Routed by session, not by room.
            EnvelopeType::Answer | EnvelopeType::Candidate => {
                if envelope.from == *me || envelope.is_addressed_elsewhere(me) {
                    debug!("Ignoring {} from {} for {}", envelope.kind, envelope.from, envelope.endpoint);
                    return;
                }
                match envelope.kind {
                    EnvelopeType::Answer => self.handle_answer(envelope).await,
                    _ => self.handle_remote_candidate(envelope).await,
                }
            }
        }
    }

    async fn handle_connection_request(&mut self, envelope: Envelope) {
        let requester = envelope.requester();
        if requester == self.config.peer_id {
            return;
        }
        info!("Peer {} wants to connect", requester);

        if let Some(existing) = self.sessions.get(&requester) {
            let connected = existing.is_connected();
            // A full node answers every announcement. The open connection
            // to the requester is kept.
            if let (true, Admission::Reject { reason }) = (connected, self.try_admit()) {
                info!("Rejecting repeated request from {}: {}", envelope.from, reason);
                self.send_to_peer(&envelope.from, EnvelopeType::RejectConnection, reason)
                    .await;
            } else {
                debug!("Already connected or negotiating with {}", requester);
            }
            return;
        }

        match self.try_admit() {
            Admission::Admit => self.open_session(requester, Role::Initiator, None).await,
            Admission::Reject { reason } => {
                info!("Rejecting {}: {}", envelope.from, reason);
                self.send_to_peer(&envelope.from, EnvelopeType::RejectConnection, reason)
                    .await;
            }
        }
    }

    async fn handle_offer(&mut self, envelope: Envelope) {
        let peer_id = envelope.from.clone();
        let Some(offer) = envelope.data else {
            return;
        };
        info!("Got offer from {}", peer_id);

        if let Some(existing) = self.sessions.get(&peer_id) {
            // Both sides offered at once: the larger id keeps its offer.
            if existing.awaits_answer() && self.config.peer_id > peer_id {
                debug!("Offer collision with {}, keeping ours", peer_id);
                return;
            }
            if let Some(existing) = self.sessions.remove(&peer_id) {
                info!("Replacing session with {}", peer_id);
                self.teardown(existing).await;
            }
        }

        match self.try_admit() {
            Admission::Admit => {
                self.open_session(peer_id, Role::Responder, Some(offer))
                    .await
            }
            Admission::Reject { reason } => {
                info!("Rejecting offer from {}: {}", peer_id, reason);
                self.send_to_peer(&peer_id, EnvelopeType::RejectConnection, reason)
                    .await;
            }
        }
    }

    async fn handle_reject(&mut self, envelope: Envelope) {
        info!(
            "Connection rejected by {}: {}",
            envelope.from,
            envelope.data.as_deref().unwrap_or_default()
        );

        let negotiating = self
            .sessions
            .get(&envelope.from)
            .is_some_and(|session| !session.is_connected());
        if negotiating && let Some(session) = self.sessions.remove(&envelope.from) {
            self.teardown(session).await;
        }
    }

    async fn handle_answer(&mut self, envelope: Envelope) {
        let Some(answer) = envelope.data else {
            return;
        };
        let Some(session) = self.sessions.get_mut(&envelope.from) else {
            debug!("Dropping answer from {}: no session", envelope.from);
            return;
        };
        if !session.awaits_answer() {
            debug!("Dropping unexpected answer from {}", envelope.from);
            return;
        }

        let connection = session.connection();
        if let Err(e) = connection.set_remote_description(answer).await {
            warn!("Failed to apply answer from {}: {}", envelope.from, e);
            self.abandon(&envelope.from).await;
            return;
        }

        let pending = session.remote_description_applied();
        debug!("Answer from {} applied", envelope.from);
        Self::apply_candidates(&envelope.from, connection.as_ref(), pending).await;
    }

    async fn handle_remote_candidate(&mut self, envelope: Envelope) {
        let Some(candidate) = envelope.data else {
            return;
        };
        let Some(session) = self.sessions.get_mut(&envelope.from) else {
            debug!("Dropping candidate from {}: no session", envelope.from);
            return;
        };

        match session.accept_remote_candidate(candidate) {
            Some(candidate) => {
                let connection = session.connection();
                Self::apply_candidates(&envelope.from, connection.as_ref(), vec![candidate]).await;
            }
            None => debug!("Buffered early candidate from {}", envelope.from),
        }
    }

    async fn apply_candidates(
        peer_id: &PeerId,
        connection: &dyn DirectConnection,
        candidates: Vec<String>,
    ) {
        for candidate in candidates {
            if let Err(e) = connection.add_remote_candidate(candidate).await {
                warn!("Failed to add ICE candidate for {}: {}", peer_id, e);
            }
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        let tag = event.tag();
        if !self
            .sessions
            .get(&tag.peer_id)
            .is_some_and(|session| session.owns(tag))
        {
            debug!("Dropping event for stale connection {}", tag);
            return;
        }

        match event {
            TransportEvent::LocalDescription(tag, sdp) => {
                self.handle_local_description(tag, sdp).await
            }

            TransportEvent::LocalCandidate(tag, candidate) => {
                let Some(session) = self.sessions.get_mut(&tag.peer_id) else {
                    return;
                };
                if let Some(candidate) = session.queue_local_candidate(candidate) {
                    self.send_to_peer(&tag.peer_id, EnvelopeType::Candidate, candidate)
                        .await;
                }
            }

            TransportEvent::ChannelOpen(tag) => self.handle_channel_open(tag).await,

            TransportEvent::Message(tag, data) => {
                // The channel can report data before its open callback runs.
                self.handle_channel_open(tag.clone()).await;
                match DirectPayload::from_slice(&data) {
                    Ok(message) => {
                        let ctx = self.context();
                        self.behavior.on_message(&ctx, tag.peer_id, message).await;
                    }
                    Err(e) => warn!("Invalid payload from {}: {}", tag, e),
                }
            }

            TransportEvent::Disconnected(tag) => {
                info!("Connection to {} closed", tag);
                self.abandon(&tag.peer_id).await;
            }

            TransportEvent::Failed(tag, reason) => {
                error!("Negotiation with {} failed: {}", tag, reason);
                self.abandon(&tag.peer_id).await;
            }
        }
    }

    async fn handle_local_description(&mut self, tag: ConnectionTag, sdp: String) {
        let Some(session) = self.sessions.get_mut(&tag.peer_id) else {
            return;
        };
        let Some(kind) = session.local_description_ready() else {
            debug!("Ignoring late local description for {}", tag);
            return;
        };

        info!("Sending {} to {}", kind, tag.peer_id);
        self.send_to_peer(&tag.peer_id, kind, sdp).await;

        let held_back = match self.sessions.get_mut(&tag.peer_id) {
            Some(session) => session.local_description_sent(),
            None => return,
        };
        for candidate in held_back {
            self.send_to_peer(&tag.peer_id, EnvelopeType::Candidate, candidate)
                .await;
        }
    }

    async fn handle_channel_open(&mut self, tag: ConnectionTag) {
        let Some(session) = self.sessions.get_mut(&tag.peer_id) else {
            return;
        };
        if session.is_connected() {
            return;
        }

        session.mark_connected();
        self.registry
            .add(tag.peer_id.clone(), session.connection());
        info!(
            "Peer {} connected ({}/{})",
            tag.peer_id,
            self.registry.count(),
            self.admission.capacity()
        );

        let ctx = self.context();
        self.behavior.on_open(&ctx, tag.peer_id).await;
    }

    /// Start a negotiation. For the responder `remote_offer` is applied
    /// before the local answer is requested.
    async fn open_session(&mut self, peer_id: PeerId, role: Role, remote_offer: Option<String>) {
        self.next_serial += 1;
        let tag = ConnectionTag {
            peer_id: peer_id.clone(),
            serial: self.next_serial,
        };

        let connection = match self
            .connector
            .connect(tag.clone(), role, self.transport_tx.clone())
            .await
        {
            Ok(connection) => connection,
            Err(e) => {
                error!("Failed to create connection for {}: {:?}", tag, e);
                return;
            }
        };

        let mut session = NegotiationSession::new(tag.clone(), role, connection.clone());
        if let Some(offer) = remote_offer {
            if let Err(e) = connection.set_remote_description(offer).await {
                warn!("Failed to apply offer from {}: {}", peer_id, e);
                let _ = connection.close().await;
                return;
            }
            session.remote_description_applied();
        }

        debug!("Session {} opened as {:?}", tag, role);
        self.sessions.insert(peer_id, session);
        self.request_local_description(tag, connection);
    }

    /// The description is produced off the loop and comes back as
    /// `TransportEvent::LocalDescription`.
    fn request_local_description(&self, tag: ConnectionTag, connection: Arc<dyn DirectConnection>) {
        let tx = self.transport_tx.clone();
        tokio::spawn(async move {
            let event = match connection.create_local_description().await {
                Ok(sdp) => TransportEvent::LocalDescription(tag, sdp),
                Err(e) => TransportEvent::Failed(tag, format!("local description: {e}")),
            };
            let _ = tx.send(event).await;
        });
    }

    async fn expire_stalled_sessions(&mut self) {
        let now = Instant::now();
        let timeout = self.config.negotiation_timeout;
        let expired: Vec<PeerId> = self
            .sessions
            .values()
            .filter(|session| session.is_expired(now, timeout))
            .map(|session| session.peer_id().clone())
            .collect();

        for peer_id in expired {
            warn!("Negotiation with {} timed out", peer_id);
            self.abandon(&peer_id).await;
        }
    }

    async fn abandon(&mut self, peer_id: &PeerId) {
        if let Some(session) = self.sessions.remove(peer_id) {
            self.teardown(session).await;
        }
    }

    /// Close the session's connection. The application only hears about
    /// connections that had opened.
    async fn teardown(&mut self, session: NegotiationSession) {
        let peer_id = session.peer_id().clone();
        let was_connected = session.is_connected();

        self.registry.remove(&peer_id);
        if let Err(e) = session.connection().close().await {
            debug!("Closing connection to {} failed: {}", peer_id, e);
        }

        if was_connected {
            let ctx = self.context();
            self.behavior.on_close(&ctx, peer_id).await;
        }
    }

    async fn close_all(&mut self) {
        let sessions: Vec<NegotiationSession> = self.sessions.drain().map(|(_, s)| s).collect();
        for session in sessions {
            self.teardown(session).await;
        }
    }

    fn try_admit(&self) -> Admission {
        let in_flight = self
            .sessions
            .values()
            .filter(|session| !session.is_connected())
            .count();
        self.admission.try_admit(self.registry.count(), in_flight)
    }

    fn snapshot(&self) -> NodeSnapshot {
        let mut sessions: Vec<SessionSnapshot> = self
            .sessions
            .values()
            .map(|session| SessionSnapshot {
                peer_id: session.peer_id().clone(),
                role: session.role(),
                state: session.state(),
            })
            .collect();
        sessions.sort_by(|a, b| a.peer_id.cmp(&b.peer_id));

        NodeSnapshot {
            sessions,
            connected: self.registry.peers(),
        }
    }

    async fn send_to_room(&self, kind: EnvelopeType, data: Option<String>) {
        if self.config.room.is_empty() {
            warn!("Please provide a room code");
            return;
        }
        let envelope = Envelope::to_room(
            self.config.room.clone(),
            self.config.peer_id.clone(),
            kind,
            data,
        );
        self.signaling.send_envelope(envelope).await;
    }

    async fn send_to_peer(&self, peer_id: &PeerId, kind: EnvelopeType, data: String) {
        if self.config.room.is_empty() {
            warn!("Please provide a room code");
            return;
        }
        let envelope = Envelope::to_peer(
            self.config.room.clone(),
            self.config.peer_id.clone(),
            peer_id,
            kind,
            data,
        );
        self.signaling.send_envelope(envelope).await;
    }
}
