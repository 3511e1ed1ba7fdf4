use crate::transport::connection_wrapper::ConnectionWrapper;
use crate::transport::transport_config::TransportConfig;
use crate::transport::transport_event::{ConnectionTag, TransportEvent};
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Which side of the offer/answer exchange a connection plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Answered a room announcement; opens the data channel and sends the offer.
    Initiator,
    /// Received an offer; sends the answer.
    Responder,
}

/// A direct connection as seen by the negotiation engine.
///
/// Everything asynchronous the library wants to report goes through the
/// `TransportEvent` channel handed to [`PeerConnector::connect`], never
/// through return values of these methods.
#[async_trait]
pub trait DirectConnection: Send + Sync {
    /// Produce and apply the local description: an offer for the initiator,
    /// an answer for the responder.
    async fn create_local_description(&self) -> Result<String>;

    /// Apply the remote description: the answer for the initiator, the offer
    /// for the responder.
    async fn set_remote_description(&self, sdp: String) -> Result<()>;

    async fn add_remote_candidate(&self, candidate: String) -> Result<()>;

    /// Write to the data channel. Fails if the channel is not open.
    async fn send(&self, data: Bytes) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// Creates direct connections. Implemented on top of `webrtc` by
/// [`WebRtcConnector`]; tests plug in scripted connectors.
#[async_trait]
pub trait PeerConnector: Send + Sync {
    async fn connect(
        &self,
        tag: ConnectionTag,
        role: Role,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn DirectConnection>>;
}

pub struct WebRtcConnector {
    config: TransportConfig,
}

impl WebRtcConnector {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

impl Default for WebRtcConnector {
    fn default() -> Self {
        Self::new(TransportConfig::default())
    }
}

#[async_trait]
impl PeerConnector for WebRtcConnector {
    async fn connect(
        &self,
        tag: ConnectionTag,
        role: Role,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Arc<dyn DirectConnection>> {
        let wrapper = ConnectionWrapper::new(tag, role, self.config.clone(), events).await?;
        Ok(Arc::new(wrapper))
    }
}
