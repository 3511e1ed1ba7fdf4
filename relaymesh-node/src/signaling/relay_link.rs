use crate::error::RelayError;
use crate::node::NodeCommand;
use crate::signaling::SignalingOutput;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use relaymesh_core::{Envelope, PeerId, RoomId};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use url::Url;

type RelayStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Websocket connection to the relay.
///
/// Outgoing envelopes are queued and written by a background task; incoming
/// frames are decoded and forwarded to the node as
/// [`NodeCommand::Envelope`]. Dropping the link closes the socket.
pub struct RelayLink {
    outgoing: mpsc::UnboundedSender<Message>,
    url: Url,
}

impl RelayLink {
    /// `base` with the node's identity as query parameters:
    /// `ws://host:port?user=<id>&room=<room>`.
    pub fn relay_url(base: &str, peer_id: &PeerId, room: &RoomId) -> Result<Url, RelayError> {
        let mut url = Url::parse(base)?;
        url.query_pairs_mut()
            .append_pair("user", peer_id.as_str())
            .append_pair("room", room.as_str());
        Ok(url)
    }

    /// Join the relay. Resolves once the relay accepted the connection, or
    /// with the reason it did not.
    pub async fn connect(
        base: &str,
        peer_id: &PeerId,
        room: &RoomId,
        command_tx: mpsc::Sender<NodeCommand>,
    ) -> Result<Self, RelayError> {
        let url = Self::relay_url(base, peer_id, room)?;
        info!("Joining relay {}", url);

        let (stream, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| match e {
                tungstenite::Error::Http(ref response) => {
                    RelayError::Rejected(response.status().as_u16())
                }
                other => RelayError::Join(Box::new(other)),
            })?;
        info!("Relay joined as {}", peer_id);

        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_link(stream, outgoing_rx, command_tx));

        Ok(Self { outgoing, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn is_open(&self) -> bool {
        !self.outgoing.is_closed()
    }

    /// Resolves once the socket to the relay is gone. Envelopes sent after
    /// that are dropped.
    pub async fn closed(&self) {
        self.outgoing.closed().await
    }
}

#[async_trait]
impl SignalingOutput for RelayLink {
    async fn send_envelope(&self, envelope: Envelope) {
        match envelope.to_json() {
            Ok(json) => {
                if let Err(e) = self.outgoing.send(Message::Text(json.into())) {
                    error!("Failed to queue {} for the relay: {}", envelope.kind, e);
                }
            }
            Err(e) => error!("Failed to serialize envelope: {}", e),
        }
    }
}

async fn run_link(
    stream: RelayStream,
    mut outgoing_rx: mpsc::UnboundedReceiver<Message>,
    command_tx: mpsc::Sender<NodeCommand>,
) {
    let (mut sink, mut source) = stream.split();

    loop {
        tokio::select! {
            msg = outgoing_rx.recv() => {
                let Some(msg) = msg else {
                    debug!("Relay link dropped, closing socket");
                    let _ = sink.close().await;
                    return;
                };
                if let Err(e) = sink.send(msg).await {
                    warn!("Failed to write to relay: {}", e);
                    break;
                }
            }

            frame = source.next() => {
                let text = match frame {
                    Some(Ok(Message::Text(text))) => text.as_str().to_owned(),
                    // Some implementations send JSON as binary frames.
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => text,
                        Err(_) => {
                            warn!("Dropping non UTF-8 relay frame");
                            continue;
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Relay closed the connection");
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        error!("Relay connection error: {}", e);
                        break;
                    }
                };

                match Envelope::from_json(&text) {
                    Ok(envelope) => {
                        if command_tx.send(NodeCommand::Envelope(envelope)).await.is_err() {
                            info!("Node stopped, leaving relay");
                            break;
                        }
                    }
                    Err(e) => warn!("Dropping relay frame: {}", e),
                }
            }
        }
    }

    warn!("Relay link closed, no further envelopes will be exchanged");
}
