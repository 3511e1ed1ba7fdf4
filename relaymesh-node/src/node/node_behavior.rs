use crate::node::context::NodeContext;
use async_trait::async_trait;
use relaymesh_core::{DirectPayload, PeerId};

/// Application callbacks for direct connections.
///
/// Only connections whose data channel opened are reported, and for each of
/// them the calls come in the order open, messages, close.
#[async_trait]
pub trait NodeBehavior: Send + Sync + 'static {
    async fn on_open(&self, ctx: &NodeContext, peer_id: PeerId);

    async fn on_message(&self, ctx: &NodeContext, peer_id: PeerId, message: DirectPayload);

    async fn on_close(&self, ctx: &NodeContext, peer_id: PeerId);
}
