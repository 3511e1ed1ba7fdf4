use async_trait::async_trait;
use relaymesh_core::Envelope;

/// Outgoing side of the relay, as the node sees it.
///
/// Sends are fire-and-forget: the relay gives no acknowledgement and a lost
/// envelope is only noticed through the negotiation never completing.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    async fn send_envelope(&self, envelope: Envelope);
}
