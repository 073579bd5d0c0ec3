//! The document store seam: storage shape, change events and the
//! [`DocumentStore`] trait implemented by concrete backends.

use crate::sync::StoreError;
use crate::{ClientId, RoomId};
use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use xiangqi_rules::Side;

/// One stored room: two indexable scalar columns plus a structured blob
/// carrying board, history, players and metadata.
#[derive(Debug, Clone, PartialEq, Getters, new)]
pub struct StoredRow {
    room_id: RoomId,
    turn: Side,
    winner: Option<Side>,
    data: serde_json::Value,
}

/// A write against an existing row. The blob is always written whole;
/// `None` scalar columns keep their stored value.
#[derive(Debug, Clone, PartialEq, Getters, new)]
pub struct RowUpdate {
    turn: Option<Side>,
    winner: Option<Option<Side>>,
    data: serde_json::Value,
}

impl RowUpdate {
    /// Applies this update to a stored row.
    pub fn apply_to(&self, row: &mut StoredRow) {
        if let Some(turn) = self.turn {
            row.turn = turn;
        }
        if let Some(winner) = self.winner {
            row.winner = winner;
        }
        row.data = self.data.clone();
    }
}

/// Out-of-band signal relayed on the room channel for peer media setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PeerSignal {
    /// A participant asks the others to open a media connection.
    RequestConnection {
        /// Who is asking.
        from: ClientId,
    },
}

/// Raw notification delivered by a store.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    /// The room row was created or updated.
    Changed(StoredRow),
    /// A peer signal was broadcast.
    Signal(PeerSignal),
}

/// Callback invoked once per room notification.
pub type ChangeCallback = Arc<dyn Fn(RoomEvent) + Send + Sync>;

/// Identifies one registered subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, new)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    /// Raw handle value.
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Realtime document store holding one row per room.
///
/// Writes are last-write-wins per row; there are no transactions spanning a
/// fetch and a later update.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a new room row.
    async fn create(&self, row: StoredRow) -> Result<(), StoreError>;

    /// Reads the room row, `None` when the room does not exist.
    async fn fetch(&self, room: &RoomId) -> Result<Option<StoredRow>, StoreError>;

    /// Overwrites the room row's columns and blob, returning the stored row.
    async fn update(&self, room: &RoomId, update: RowUpdate) -> Result<StoredRow, StoreError>;

    /// Registers a callback for changes and signals on the room channel.
    async fn subscribe(
        &self,
        room: &RoomId,
        on_change: ChangeCallback,
    ) -> Result<SubscriptionHandle, StoreError>;

    /// Removes a subscription. Unknown handles are ignored.
    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), StoreError>;

    /// Relays a peer signal to every subscriber of the room.
    async fn broadcast(&self, room: &RoomId, signal: PeerSignal) -> Result<(), StoreError>;
}
