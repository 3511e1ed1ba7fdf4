use async_trait::async_trait;
use relaymesh_node::{DirectPayload, NodeBehavior, NodeContext, PeerId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BehaviorEvent {
    Open(PeerId),
    Message(PeerId, DirectPayload),
    Close(PeerId),
}

/// NodeBehavior that records every callback.
#[derive(Clone, Default)]
pub struct TestNodeBehavior {
    events: Arc<Mutex<Vec<BehaviorEvent>>>,
}

impl TestNodeBehavior {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<BehaviorEvent> {
        self.events.lock().await.clone()
    }

    /// Wait until at least `count` events were recorded.
    pub async fn wait_for_events(&self, count: usize, timeout_ms: u64) -> bool {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if self.events.lock().await.len() >= count {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub async fn has_open(&self, peer_id: &PeerId) -> bool {
        self.events
            .lock()
            .await
            .contains(&BehaviorEvent::Open(peer_id.clone()))
    }

    pub async fn has_close(&self, peer_id: &PeerId) -> bool {
        self.events
            .lock()
            .await
            .contains(&BehaviorEvent::Close(peer_id.clone()))
    }

    pub async fn messages(&self) -> Vec<DirectPayload> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|e| match e {
                BehaviorEvent::Message(_, message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl NodeBehavior for TestNodeBehavior {
    async fn on_open(&self, _ctx: &NodeContext, peer_id: PeerId) {
        self.events.lock().await.push(BehaviorEvent::Open(peer_id));
    }

    async fn on_message(&self, _ctx: &NodeContext, peer_id: PeerId, message: DirectPayload) {
        self.events
            .lock()
            .await
            .push(BehaviorEvent::Message(peer_id, message));
    }

    async fn on_close(&self, _ctx: &NodeContext, peer_id: PeerId) {
        self.events.lock().await.push(BehaviorEvent::Close(peer_id));
    }
}
