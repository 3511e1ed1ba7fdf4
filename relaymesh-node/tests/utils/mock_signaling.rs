use async_trait::async_trait;
use relaymesh_node::{Envelope, EnvelopeType, PeerId, SignalingOutput};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// Mock SignalingOutput that captures every envelope the node sends.
#[derive(Clone)]
pub struct MockSignalingOutput {
    /// Channel to forward captured envelopes.
    tx: mpsc::UnboundedSender<Envelope>,
    /// All captured envelopes (for verification).
    envelopes: Arc<Mutex<Vec<Envelope>>>,
}

impl MockSignalingOutput {
    /// Create a new MockSignalingOutput and its receiver channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let signaling = Self {
            tx,
            envelopes: Arc::new(Mutex::new(Vec::new())),
        };
        (signaling, rx)
    }

    pub async fn envelopes(&self) -> Vec<Envelope> {
        self.envelopes.lock().await.clone()
    }

    /// Envelopes of `kind` addressed to `peer_id`, in send order.
    pub async fn sent_to(&self, peer_id: &PeerId, kind: EnvelopeType) -> Vec<Envelope> {
        self.envelopes
            .lock()
            .await
            .iter()
            .filter(|e| e.kind == kind && e.endpoint == peer_id.as_str())
            .cloned()
            .collect()
    }

    pub async fn count_of(&self, kind: EnvelopeType) -> usize {
        self.envelopes
            .lock()
            .await
            .iter()
            .filter(|e| e.kind == kind)
            .count()
    }
}

#[async_trait]
impl SignalingOutput for MockSignalingOutput {
    async fn send_envelope(&self, envelope: Envelope) {
        tracing::debug!(
            "[MockSignaling] {} to {}",
            envelope.kind,
            envelope.endpoint
        );

        self.envelopes.lock().await.push(envelope.clone());
        let _ = self.tx.send(envelope);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaymesh_node::RoomId;

    #[tokio::test]
    async fn test_mock_signaling_captures_envelopes() {
        let (signaling, mut rx) = MockSignalingOutput::new();
        let envelope = Envelope::to_peer(
            RoomId::from("room"),
            PeerId::from("me"),
            &PeerId::from("you"),
            EnvelopeType::Offer,
            "sdp",
        );

        signaling.send_envelope(envelope.clone()).await;

        assert_eq!(rx.recv().await.unwrap(), envelope);
        let sent = signaling
            .sent_to(&PeerId::from("you"), EnvelopeType::Offer)
            .await;
        assert_eq!(sent, vec![envelope]);
        assert_eq!(signaling.count_of(EnvelopeType::Answer).await, 0);
    }
}
