use crate::model::peer::PeerId;
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `endpoint` value of a room-wide envelope.
pub const ENDPOINT_ANY: &str = "any";

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("malformed envelope: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("failed to encode envelope: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("envelope field `{0}` is empty")]
    EmptyField(&'static str),

    #[error("`{0}` envelope carries no data")]
    MissingData(EnvelopeType),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    #[serde(rename = "one-to-one")]
    OneToOne,
    #[serde(rename = "one-to-room")]
    OneToRoom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnvelopeType {
    #[serde(rename = "HANDLE_CONNECTION")]
    HandleConnection,
    #[serde(rename = "offer")]
    Offer,
    #[serde(rename = "answer")]
    Answer,
    #[serde(rename = "candidate")]
    Candidate,
    #[serde(rename = "REJECT_CONNECTION")]
    RejectConnection,
}

impl EnvelopeType {
    pub fn requires_data(self) -> bool {
        !matches!(self, EnvelopeType::HandleConnection)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EnvelopeType::HandleConnection => "HANDLE_CONNECTION",
            EnvelopeType::Offer => "offer",
            EnvelopeType::Answer => "answer",
            EnvelopeType::Candidate => "candidate",
            EnvelopeType::RejectConnection => "REJECT_CONNECTION",
        }
    }
}

impl std::fmt::Display for EnvelopeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit of relay traffic.
///
/// Field names and enum spellings are the interop contract with other
/// implementations; do not rename them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub protocol: Protocol,
    pub room: RoomId,
    pub from: PeerId,
    pub endpoint: String,
    #[serde(rename = "type")]
    pub kind: EnvelopeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl Envelope {
    /// Room-wide announcement. `HANDLE_CONNECTION` without data carries the
    /// sender's id so the recipient can use it as correlation key.
    pub fn to_room(room: RoomId, from: PeerId, kind: EnvelopeType, data: Option<String>) -> Self {
        let data = match (kind, data) {
            (EnvelopeType::HandleConnection, None) => Some(from.to_string()),
            (_, data) => data,
        };

        Self {
            protocol: Protocol::OneToRoom,
            room,
            from,
            endpoint: ENDPOINT_ANY.to_owned(),
            kind,
            data,
        }
    }

    pub fn to_peer(
        room: RoomId,
        from: PeerId,
        endpoint: &PeerId,
        kind: EnvelopeType,
        data: impl Into<String>,
    ) -> Self {
        Self {
            protocol: Protocol::OneToOne,
            room,
            from,
            endpoint: endpoint.to_string(),
            kind,
            data: Some(data.into()),
        }
    }

    /// Parses and validates a relay frame. Anything that would need an
    /// optimistic field access later is rejected here.
    pub fn from_json(text: &str) -> Result<Self, EnvelopeError> {
        let envelope: Envelope = serde_json::from_str(text).map_err(EnvelopeError::Malformed)?;
        envelope.validate()?;
        Ok(envelope)
    }

    pub fn to_json(&self) -> Result<String, EnvelopeError> {
        serde_json::to_string(self).map_err(EnvelopeError::Encode)
    }

    pub fn validate(&self) -> Result<(), EnvelopeError> {
        if self.from.is_empty() {
            return Err(EnvelopeError::EmptyField("from"));
        }
        if self.endpoint.is_empty() {
            return Err(EnvelopeError::EmptyField("endpoint"));
        }
        if self.kind.requires_data() && self.data.as_deref().is_none_or(str::is_empty) {
            return Err(EnvelopeError::MissingData(self.kind));
        }
        Ok(())
    }

    /// Addressing filter for `HANDLE_CONNECTION`, `offer` and
    /// `REJECT_CONNECTION`: never our own echo; otherwise unicast to us OR
    /// broadcast to our room.
    pub fn should_respond(&self, me: &PeerId, room: &RoomId) -> bool {
        self.from != *me && (self.endpoint == me.as_str() || self.room == *room)
    }

    /// True when the envelope names a specific node other than `me`.
    pub fn is_addressed_elsewhere(&self, me: &PeerId) -> bool {
        self.endpoint != ENDPOINT_ANY && self.endpoint != me.as_str()
    }

    /// Id a connection request should be answered to: the announced id in
    /// `data`, falling back to the sender.
    pub fn requester(&self) -> PeerId {
        match self.data.as_deref() {
            Some(id) if !id.is_empty() => PeerId::from(id),
            _ => self.from.clone(),
        }
    }
}
