//! Mapping between [`SessionState`] and the stored row shape.
//!
//! The blob is a JSON object with `board`, `history`, `players` and `meta`
//! keys. Packing merges a [`StatePatch`] into the previous blob key by key
//! (and `meta` field by field), so anything the patch does not mention
//! survives untouched. Older clients stored a bare board array as the blob;
//! unpacking accepts that shape and defaults everything else.

use crate::RoomId;
use crate::session::{Players, SessionMeta, SessionState, StatePatch};
use crate::sync::{RowUpdate, StoredRow, SyncError};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument};
use xiangqi_rules::{Board, Move};

const BOARD: &str = "board";
const HISTORY: &str = "history";
const PLAYERS: &str = "players";
const META: &str = "meta";
const LAST_MOVE_AT: &str = "lastMoveAt";
const UNDO_REQUESTED_BY: &str = "undoRequestedBy";
const HELPER: &str = "helper";
const VERSION: &str = "version";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Blob {
    board: Option<Board>,
    history: Vec<Move>,
    players: Players,
    meta: SessionMeta,
}

/// Write counter recorded in a blob, `0` when absent.
pub fn blob_version(data: &Value) -> u64 {
    data.get(META)
        .and_then(|meta| meta.get(VERSION))
        .and_then(Value::as_u64)
        .unwrap_or(0)
}

/// Merges `patch` into `prior`, producing the row update to write.
///
/// Every blob key the patch leaves `None` is carried over from `prior`, and
/// the blob's write counter is bumped by one.
///
/// # Errors
///
/// [`SyncError::Codec`] if a patched field fails to serialize.
#[instrument(skip_all)]
pub fn pack(patch: &StatePatch, prior: &Value) -> Result<RowUpdate, SyncError> {
    let mut blob = match prior {
        Value::Object(map) => map.clone(),
        Value::Array(_) => {
            debug!("Upgrading bare board blob");
            let mut map = Map::new();
            map.insert(BOARD.to_string(), prior.clone());
            map
        }
        _ => Map::new(),
    };

    if let Some(board) = &patch.board {
        blob.insert(BOARD.to_string(), serde_json::to_value(board)?);
    }
    if let Some(history) = &patch.history {
        blob.insert(HISTORY.to_string(), serde_json::to_value(history)?);
    }
    if let Some(players) = &patch.players {
        blob.insert(PLAYERS.to_string(), serde_json::to_value(players)?);
    }

    let mut meta = match blob.remove(META) {
        Some(Value::Object(meta)) => meta,
        _ => Map::new(),
    };
    if let Some(at) = patch.meta.last_move_at {
        meta.insert(LAST_MOVE_AT.to_string(), Value::from(at.timestamp_millis()));
    }
    if let Some(undo) = patch.meta.undo_requested_by {
        meta.insert(UNDO_REQUESTED_BY.to_string(), serde_json::to_value(undo)?);
    }
    if let Some(helper) = &patch.meta.helper {
        meta.insert(HELPER.to_string(), serde_json::to_value(helper)?);
    }
    let version = blob_version(prior) + 1;
    meta.insert(VERSION.to_string(), Value::from(version));
    blob.insert(META.to_string(), Value::Object(meta));

    debug!(version, "Packed patch");
    Ok(RowUpdate::new(patch.turn, patch.winner, Value::Object(blob)))
}

/// Packs a complete state into a fresh row.
///
/// # Errors
///
/// [`SyncError::Codec`] if serialization fails.
#[instrument(skip(state))]
pub fn pack_new(room: &RoomId, state: &SessionState) -> Result<StoredRow, SyncError> {
    let update = pack(&StatePatch::full(state), &Value::Null)?;
    Ok(StoredRow::new(
        room.clone(),
        *state.turn(),
        *state.winner(),
        update.data().clone(),
    ))
}

/// Decodes a stored row into the full logical state.
///
/// # Errors
///
/// [`SyncError::Codec`] if the blob has the wrong shape.
#[instrument(skip(row), fields(room = %row.room_id()))]
pub fn unpack(row: &StoredRow) -> Result<SessionState, SyncError> {
    let blob = match row.data() {
        Value::Array(_) => {
            debug!("Decoding bare board blob");
            Blob {
                board: Some(serde_json::from_value(row.data().clone())?),
                ..Blob::default()
            }
        }
        Value::Null => Blob::default(),
        data => serde_json::from_value(data.clone())?,
    };
    Ok(SessionState::from_parts(
        blob.board.unwrap_or_else(Board::initial),
        *row.turn(),
        blob.history,
        *row.winner(),
        blob.players,
        blob.meta,
    ))
}
