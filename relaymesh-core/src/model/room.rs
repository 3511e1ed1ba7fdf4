use serde::{Deserialize, Serialize};
use std::fmt;

/// Room a node meshes within. Chosen by the user; an empty room disables
/// outgoing negotiation.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq, Default)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(room: impl Into<String>) -> Self {
        Self(room.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
