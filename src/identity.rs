//! Participant and room identifiers.

use derive_more::{Display, Error};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::instrument;

/// Opaque, locally generated participant identity.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Wraps an existing identity string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random identity.
    #[instrument]
    pub fn generate() -> Self {
        Self(format!("{:032x}", rand::random::<u128>()))
    }

    /// Returns the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Four-digit numeric room code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(try_from = "String", into = "String")]
pub struct RoomId(String);

impl RoomId {
    /// Generates a random room code.
    #[instrument]
    pub fn generate() -> Self {
        let code = rand::thread_rng().gen_range(0..10_000);
        Self(format!("{:04}", code))
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A room code that is not exactly four ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("Invalid room code '{}': expected 4 digits", code)]
pub struct InvalidRoomId {
    /// The rejected code.
    pub code: String,
}

impl FromStr for RoomId {
    type Err = InvalidRoomId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_string())
    }
}

impl TryFrom<String> for RoomId {
    type Error = InvalidRoomId;

    fn try_from(code: String) -> Result<Self, Self::Error> {
        if code.len() == 4 && code.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(code))
        } else {
            Err(InvalidRoomId { code })
        }
    }
}

impl From<RoomId> for String {
    fn from(id: RoomId) -> Self {
        id.0
    }
}
