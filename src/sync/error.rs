//! Document store and sync protocol errors.

use crate::RoomId;
use derive_more::{Display, Error, From};
use tracing::instrument;

/// Store transport or configuration failure, with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Store error: {} at {}:{}", message, file, line)]
pub struct StoreError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl StoreError {
    /// Creates a new store error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

/// Failure of a sync protocol operation.
#[derive(Debug, Clone, Display, Error, From)]
pub enum SyncError {
    /// No stored row for the room.
    #[display("Room {} not found", _0)]
    RoomNotFound(#[error(not(source))] RoomId),

    /// The store could not be reached or refused the operation.
    #[display("{}", _0)]
    #[from]
    Store(StoreError),

    /// Stored data could not be encoded or decoded.
    #[display("Codec error: {}", _0)]
    Codec(#[error(not(source))] String),
}

impl From<serde_json::Error> for SyncError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::Codec(err.to_string())
    }
}
