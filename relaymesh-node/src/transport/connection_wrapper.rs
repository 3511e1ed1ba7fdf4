use crate::transport::peer_connector::{DirectConnection, Role};
use crate::transport::transport_config::TransportConfig;
use crate::transport::transport_event::{ConnectionTag, TransportEvent};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::setting_engine::SettingEngine;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

type ChannelSlot = Arc<Mutex<Option<Arc<RTCDataChannel>>>>;

/// `DirectConnection` backed by a `webrtc` peer connection with one data
/// channel.
pub struct ConnectionWrapper {
    pub tag: ConnectionTag,
    pub role: Role,
    pub peer_connection: Arc<RTCPeerConnection>,
    data_channel: ChannelSlot,
}

impl ConnectionWrapper {
    /// Builds the peer connection and wires every library callback to
    /// `event_tx`. The initiator also opens the data channel here, so it is
    /// part of the offer.
    pub async fn new(
        tag: ConnectionTag,
        role: Role,
        config: TransportConfig,
        event_tx: mpsc::Sender<TransportEvent>,
    ) -> Result<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let mut setting_engine = SettingEngine::default();
        setting_engine.set_include_loopback_candidate(config.include_loopback);

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .with_setting_engine(setting_engine)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .into_iter()
                .map(|server| RTCIceServer {
                    urls: server.urls,
                    username: server.username.unwrap_or_default(),
                    credential: server.credential.unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .context("Failed to create peer connection")?,
        );
        let data_channel: ChannelSlot = Arc::new(Mutex::new(None));

        let state_tx = event_tx.clone();
        let tag_state = tag.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                let tag = tag_state.clone();

                Box::pin(async move {
                    info!("Peer connection state for {}: {:?}", tag, s);
                    match s {
                        RTCPeerConnectionState::Failed
                        | RTCPeerConnectionState::Disconnected
                        | RTCPeerConnectionState::Closed => {
                            let _ = tx.send(TransportEvent::Disconnected(tag)).await;
                        }
                        _ => {}
                    }
                })
            },
        ));

        let ice_tx = event_tx.clone();
        let tag_ice = tag.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            let tag = tag_ice.clone();

            Box::pin(async move {
                // `None` marks the end of gathering; nothing to trickle.
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let _ = tx
                    .send(TransportEvent::LocalCandidate(tag, init.candidate))
                    .await;
            })
        }));

        match role {
            Role::Initiator => {
                let dc = peer_connection
                    .create_data_channel(&config.channel_label, None)
                    .await
                    .context("Failed to create data channel")?;
                debug!("Created data channel '{}' for {}", dc.label(), tag);
                wire_data_channel(dc, tag.clone(), event_tx, data_channel.clone());
            }
            Role::Responder => {
                let dc_tx = event_tx.clone();
                let tag_dc = tag.clone();
                let slot = data_channel.clone();
                peer_connection.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
                    let tx = dc_tx.clone();
                    let tag = tag_dc.clone();
                    let slot = slot.clone();

                    Box::pin(async move {
                        debug!("Peer {} offered data channel '{}'", tag, dc.label());
                        wire_data_channel(dc, tag, tx, slot);
                    })
                }));
            }
        }

        Ok(Self {
            tag,
            role,
            peer_connection,
            data_channel,
        })
    }
}

/// Route data channel open/message/close into the event queue. The channel is
/// published in `slot` once open or once it carries data, so `send` never
/// writes to a half-open one.
fn wire_data_channel(
    dc: Arc<RTCDataChannel>,
    tag: ConnectionTag,
    tx: mpsc::Sender<TransportEvent>,
    slot: ChannelSlot,
) {
    let dc_on_open = dc.clone();
    let tx_open = tx.clone();
    let tag_open = tag.clone();
    let slot_open = slot.clone();
    dc.on_open(Box::new(move || {
        let tx = tx_open.clone();
        let tag = tag_open.clone();
        let slot = slot_open.clone();
        let channel_ready = dc_on_open.clone();

        Box::pin(async move {
            info!("Data channel open for {}", tag);
            *slot.lock() = Some(channel_ready);
            let _ = tx.send(TransportEvent::ChannelOpen(tag)).await;
        })
    }));

    let dc_on_message = dc.clone();
    let tx_msg = tx.clone();
    let tag_msg = tag.clone();
    dc.on_message(Box::new(move |msg: DataChannelMessage| {
        let tx = tx_msg.clone();
        let tag = tag_msg.clone();
        slot.lock().get_or_insert_with(|| dc_on_message.clone());
        Box::pin(async move {
            let _ = tx.send(TransportEvent::Message(tag, msg.data)).await;
        })
    }));

    dc.on_close(Box::new(move || {
        let tx = tx.clone();
        let tag = tag.clone();
        Box::pin(async move {
            info!("Data channel closed for {}", tag);
            let _ = tx.send(TransportEvent::Disconnected(tag)).await;
        })
    }));
}

/// Accepts both a bare `candidate:...` line and the JSON form of
/// `RTCIceCandidateInit`.
fn parse_candidate(candidate: String) -> Result<RTCIceCandidateInit> {
    if candidate.trim_start().starts_with('{') {
        return serde_json::from_str(&candidate).context("Failed to parse ICE candidate JSON");
    }
    Ok(RTCIceCandidateInit {
        candidate,
        ..Default::default()
    })
}

#[async_trait]
impl DirectConnection for ConnectionWrapper {
    async fn create_local_description(&self) -> Result<String> {
        let description = match self.role {
            Role::Initiator => self.peer_connection.create_offer(None).await?,
            Role::Responder => self.peer_connection.create_answer(None).await?,
        };
        self.peer_connection
            .set_local_description(description.clone())
            .await?;
        Ok(description.sdp)
    }

    async fn set_remote_description(&self, sdp: String) -> Result<()> {
        let desc = match self.role {
            Role::Initiator => RTCSessionDescription::answer(sdp)?,
            Role::Responder => RTCSessionDescription::offer(sdp)?,
        };
        self.peer_connection.set_remote_description(desc).await?;
        Ok(())
    }

    async fn add_remote_candidate(&self, candidate: String) -> Result<()> {
        let candidate = parse_candidate(candidate)?;
        self.peer_connection.add_ice_candidate(candidate).await?;
        Ok(())
    }

    async fn send(&self, data: Bytes) -> Result<()> {
        let channel = self.data_channel.lock().clone();
        let Some(channel) = channel else {
            bail!("data channel to {} is not open", self.tag);
        };
        channel.send(&data).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let channel = self.data_channel.lock().take();
        if let Some(channel) = channel
            && let Err(e) = channel.close().await
        {
            warn!("Failed to close data channel for {}: {}", self.tag, e);
        }
        self.peer_connection.close().await?;
        Ok(())
    }
}
