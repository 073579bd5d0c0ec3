//! Database models for stored rooms.

use chrono::NaiveDateTime;
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use tracing::instrument;
use xiangqi_rules::Side;

use crate::RoomId;
use crate::db::schema;
use crate::sync::{RowUpdate, StoreError, StoredRow};

/// Room row as stored.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::rooms)]
#[diesel(primary_key(room_id))]
pub struct RoomRecord {
    room_id: String,
    turn: String,
    winner: Option<String>,
    data: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl RoomRecord {
    /// Decodes the record into the store-neutral row shape.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if a column holds an unrecognized value.
    #[instrument(skip(self), fields(room_id = %self.room_id))]
    pub fn to_row(&self) -> Result<StoredRow, StoreError> {
        let room_id = self
            .room_id
            .parse::<RoomId>()
            .map_err(|e| StoreError::new(e.to_string()))?;
        let winner = self.winner.as_deref().map(parse_side).transpose()?;
        Ok(StoredRow::new(
            room_id,
            parse_side(&self.turn)?,
            winner,
            serde_json::from_str(&self.data)?,
        ))
    }
}

#[instrument]
fn parse_side(s: &str) -> Result<Side, StoreError> {
    s.parse::<Side>()
        .map_err(|_| StoreError::new(format!("Invalid side: '{}'", s)))
}

/// Insertable room row.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::rooms)]
pub struct NewRoomRecord {
    room_id: String,
    turn: String,
    winner: Option<String>,
    data: String,
}

impl NewRoomRecord {
    /// Encodes a store-neutral row for insertion.
    #[instrument(skip(row), fields(room_id = %row.room_id()))]
    pub fn from_row(row: &StoredRow) -> Self {
        Self::new(
            row.room_id().to_string(),
            row.turn().to_string(),
            row.winner().map(|s| s.to_string()),
            row.data().to_string(),
        )
    }
}

/// Column changes for an existing room.
#[derive(Debug, Clone, AsChangeset, new)]
#[diesel(table_name = schema::rooms)]
pub struct RoomChanges {
    turn: Option<String>,
    winner: Option<Option<String>>,
    data: String,
    updated_at: NaiveDateTime,
}

impl RoomChanges {
    /// Encodes a row update, stamping the modification time.
    #[instrument(skip(update))]
    pub fn from_update(update: &RowUpdate) -> Self {
        Self::new(
            update.turn().map(|s| s.to_string()),
            update.winner().map(|w| w.map(|s| s.to_string())),
            update.data().to_string(),
            chrono::Utc::now().naive_utc(),
        )
    }
}
