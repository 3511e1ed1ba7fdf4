use relaymesh_core::IceServerConfig;

/// Configuration for the direct-connection transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
    /// Label of the data channel the initiator opens.
    pub channel_label: String,
    /// Also gather loopback host candidates.
    pub include_loopback: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig::default()],
            channel_label: "sendChannel".to_owned(),
            include_loopback: false,
        }
    }
}

impl TransportConfig {
    /// No ICE servers, host and loopback candidates only. Enough for peers
    /// on the same machine.
    pub fn local_only() -> Self {
        Self {
            ice_servers: Vec::new(),
            include_loopback: true,
            ..Self::default()
        }
    }
}
