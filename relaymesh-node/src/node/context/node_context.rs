use crate::error::NodeError;
use crate::node::registry::{BroadcastReport, ConnectionRegistry};
use bytes::Bytes;
use relaymesh_core::{DirectPayload, PeerId};
use std::sync::Arc;
use tracing::error;

/// Handle to the open direct connections of one node, given to the
/// application. Cheap to clone and safe to use from any task.
#[derive(Clone)]
pub struct NodeContext {
    peer_id: PeerId,
    registry: Arc<ConnectionRegistry>,
}

impl NodeContext {
    pub(crate) fn new(peer_id: PeerId, registry: Arc<ConnectionRegistry>) -> Self {
        Self { peer_id, registry }
    }

    /// Id of the local node, used as `sender` of every payload.
    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    /// Send `payload` to one connected peer.
    pub async fn send(&self, peer_id: &PeerId, payload: &str) -> Result<(), NodeError> {
        let Some(connection) = self.registry.get(peer_id) else {
            return Err(NodeError::NotConnected(peer_id.clone()));
        };
        let bytes = self.encode(payload)?;
        connection.send(bytes).await.map_err(|e| {
            error!("Failed to send message to {}: {}", peer_id, e);
            NodeError::Send {
                peer_id: peer_id.clone(),
                reason: e.to_string(),
            }
        })
    }

    /// Send `payload` to every connected peer. With no open connection this
    /// is a no-op returning an empty report.
    pub async fn broadcast(&self, payload: &str) -> Result<BroadcastReport, NodeError> {
        if self.registry.count() == 0 {
            return Ok(BroadcastReport::default());
        }
        let bytes = self.encode(payload)?;
        Ok(self.registry.broadcast(bytes).await)
    }

    pub fn list_peers(&self) -> Vec<PeerId> {
        self.registry.peers()
    }

    pub fn contains_peer(&self, peer_id: &PeerId) -> bool {
        self.registry.contains(peer_id)
    }

    pub fn connection_count(&self) -> usize {
        self.registry.count()
    }

    fn encode(&self, payload: &str) -> Result<Bytes, NodeError> {
        let message = DirectPayload::new(self.peer_id.clone(), payload);
        Ok(Bytes::from(message.to_json()?))
    }
}
