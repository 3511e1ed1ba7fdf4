use crate::error::NodeError;
use crate::node::context::NodeContext;
use crate::node::node_command::{NodeCommand, NodeSnapshot};
use crate::node::registry::BroadcastReport;
use relaymesh_core::{PeerId, RoomId};
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

/// Capacity of the command queue between relay/application and the node.
pub const COMMAND_QUEUE: usize = 100;

/// Sender/receiver pair a [`crate::Node`] and its relay link share.
pub fn command_channel() -> (mpsc::Sender<NodeCommand>, mpsc::Receiver<NodeCommand>) {
    mpsc::channel(COMMAND_QUEUE)
}

/// Application-side handle to a running node.
#[derive(Clone)]
pub struct NodeHandle {
    command_tx: mpsc::Sender<NodeCommand>,
    ctx: NodeContext,
    room: RoomId,
}

impl NodeHandle {
    pub(crate) fn new(command_tx: mpsc::Sender<NodeCommand>, ctx: NodeContext, room: RoomId) -> Self {
        Self {
            command_tx,
            ctx,
            room,
        }
    }

    pub fn peer_id(&self) -> &PeerId {
        self.ctx.peer_id()
    }

    pub fn context(&self) -> &NodeContext {
        &self.ctx
    }

    /// Ask every node in the room to connect to us.
    pub async fn announce(&self) -> Result<(), NodeError> {
        if self.room.is_empty() {
            warn!("Please provide a room code");
            return Err(NodeError::EmptyRoom);
        }
        self.command_tx
            .send(NodeCommand::Announce)
            .await
            .map_err(|_| NodeError::Stopped)
    }

    /// Send `payload` to every open direct connection.
    pub async fn broadcast(&self, payload: &str) -> Result<BroadcastReport, NodeError> {
        self.ctx.broadcast(payload).await
    }

    pub async fn send_to(&self, peer_id: &PeerId, payload: &str) -> Result<(), NodeError> {
        self.ctx.send(peer_id, payload).await
    }

    pub fn connected_peers(&self) -> Vec<PeerId> {
        self.ctx.list_peers()
    }

    pub fn connection_count(&self) -> usize {
        self.ctx.connection_count()
    }

    pub async fn snapshot(&self) -> Result<NodeSnapshot, NodeError> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(NodeCommand::Inspect(tx))
            .await
            .map_err(|_| NodeError::Stopped)?;
        rx.await.map_err(|_| NodeError::Stopped)
    }

    /// Close every connection and stop the node. Returns once the event loop
    /// has finished.
    pub async fn shutdown(&self) -> Result<(), NodeError> {
        self.command_tx
            .send(NodeCommand::Shutdown)
            .await
            .map_err(|_| NodeError::Stopped)?;
        self.closed().await;
        Ok(())
    }

    /// Resolves when the event loop has stopped, for whatever reason.
    pub async fn closed(&self) {
        self.command_tx.closed().await
    }
}
