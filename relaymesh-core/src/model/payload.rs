use crate::model::envelope::EnvelopeError;
use crate::model::peer::PeerId;
use serde::{Deserialize, Serialize};

/// Application message carried over a direct data channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DirectPayload {
    pub sender: PeerId,
    pub payload: String,
}

impl DirectPayload {
    pub fn new(sender: PeerId, payload: impl Into<String>) -> Self {
        Self {
            sender,
            payload: payload.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, EnvelopeError> {
        serde_json::to_string(self).map_err(EnvelopeError::Encode)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        serde_json::from_slice(bytes).map_err(EnvelopeError::Malformed)
    }
}
