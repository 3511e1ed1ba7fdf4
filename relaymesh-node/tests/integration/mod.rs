pub mod lifecycle_tests;
pub mod negotiation_tests;

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::Level;

use relaymesh_node::{
    Envelope, EnvelopeType, Node, NodeCommand, NodeConfig, NodeHandle, PeerId, RoomId,
    command_channel,
};

use crate::utils::{MockConnector, MockSignalingOutput, TestNodeBehavior};

pub const ROOM: &str = "lobby";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// A node wired to mocks, plus everything a test needs to drive it.
pub struct TestNode {
    pub handle: NodeHandle,
    pub command_tx: mpsc::Sender<NodeCommand>,
    pub signal_rx: mpsc::UnboundedReceiver<Envelope>,
    pub signaling: MockSignalingOutput,
    pub behavior: TestNodeBehavior,
    pub connector: MockConnector,
}

impl TestNode {
    /// Hand `envelope` to the node as if the relay had delivered it.
    pub async fn deliver(&self, envelope: Envelope) {
        self.command_tx
            .send(NodeCommand::Envelope(envelope))
            .await
            .expect("node stopped");
    }

    /// Envelope from `from` to this node.
    pub async fn deliver_from(&self, from: &str, kind: EnvelopeType, data: &str) {
        let envelope = Envelope::to_peer(
            RoomId::from(ROOM),
            PeerId::from(from),
            self.handle.peer_id(),
            kind,
            data,
        );
        self.deliver(envelope).await;
    }

    /// `HANDLE_CONNECTION` broadcast by `from` in the test room.
    pub async fn announce_from(&self, from: &str) {
        let envelope = Envelope::to_room(
            RoomId::from(ROOM),
            PeerId::from(from),
            EnvelopeType::HandleConnection,
            None,
        );
        self.deliver(envelope).await;
    }
}

pub fn create_test_node(config: NodeConfig) -> TestNode {
    let (command_tx, command_rx) = command_channel();
    let (signaling, signal_rx) = MockSignalingOutput::new();
    let behavior = TestNodeBehavior::new();
    let connector = MockConnector::new();

    let node = Node::new(
        config,
        Box::new(behavior.clone()),
        Arc::new(connector.clone()),
        Arc::new(signaling.clone()),
        command_rx,
    );
    let handle = node.spawn(command_tx.clone());

    TestNode {
        handle,
        command_tx,
        signal_rx,
        signaling,
        behavior,
        connector,
    }
}

/// Node `me` in the test room with the given capacity.
pub fn node_config(me: &str, capacity: usize) -> NodeConfig {
    NodeConfig::new(PeerId::from(me), RoomId::from(ROOM)).with_capacity(capacity)
}

/// Drive a full mocked handshake with `peer` as the announcing side, until
/// the data channel is open.
pub async fn connect_peer(node: &mut TestNode, peer: &str) {
    use crate::utils::{SIGNAL_TIMEOUT_MS, wait_for_envelope, wait_for_snapshot};

    let peer_id = PeerId::from(peer);
    node.announce_from(peer).await;
    wait_for_envelope(&mut node.signal_rx, EnvelopeType::Offer, SIGNAL_TIMEOUT_MS)
        .await
        .expect("no offer");

    node.deliver_from(peer, EnvelopeType::Answer, "remote-answer")
        .await;
    node.connector.open_channel(&peer_id).await;

    wait_for_snapshot(&node.handle, SIGNAL_TIMEOUT_MS, |s| {
        s.connected.contains(&peer_id)
    })
    .await
    .expect("peer never connected");
}
