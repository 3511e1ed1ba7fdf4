use crate::transport::TransportConfig;
use relaymesh_core::{PeerId, RoomId};
use std::time::Duration;

pub const DEFAULT_CAPACITY: usize = 3;

/// Everything a node needs to know about itself.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub peer_id: PeerId,
    pub room: RoomId,
    /// Maximum simultaneous direct connections, in-flight negotiations included.
    pub capacity: usize,
    /// A negotiation that has not opened its data channel by then is abandoned.
    pub negotiation_timeout: Duration,
    /// How often stalled negotiations are looked for.
    pub sweep_interval: Duration,
    pub transport: TransportConfig,
}

impl NodeConfig {
    pub fn new(peer_id: PeerId, room: RoomId) -> Self {
        Self {
            peer_id,
            room,
            capacity: DEFAULT_CAPACITY,
            negotiation_timeout: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(1),
            transport: TransportConfig::default(),
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_negotiation_timeout(mut self, timeout: Duration) -> Self {
        self.negotiation_timeout = timeout;
        self
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }
}
