//! In-process realtime document store.

use crate::RoomId;
use crate::sync::{
    ChangeCallback, DocumentStore, PeerSignal, RoomEvent, RowUpdate, StoreError, StoredRow,
    Subscribers, SubscriptionHandle,
};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, instrument, warn};

/// Rooms held in memory, with change notifications fanned out to every
/// subscriber of the room (the writer included).
#[derive(Debug, Default)]
pub struct MemoryStore {
    rooms: Mutex<HashMap<RoomId, StoredRow>>,
    subscribers: Subscribers,
}

impl MemoryStore {
    /// Creates an empty store.
    #[instrument]
    pub fn new() -> Self {
        info!("Creating in-memory document store");
        Self::default()
    }

    /// Stores a row directly, bypassing the protocol and notifications.
    ///
    /// Used to seed rows in shapes older clients wrote.
    #[instrument(skip(self, row))]
    pub fn put_raw(&self, room: &RoomId, row: StoredRow) {
        self.rooms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(room.clone(), row);
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    #[instrument(skip(self, row), fields(room = %row.room_id()))]
    async fn create(&self, row: StoredRow) -> Result<(), StoreError> {
        let room = row.room_id().clone();
        {
            let mut rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
            if rooms.contains_key(&room) {
                warn!("Room already exists");
                return Err(StoreError::new(format!("Room {} already exists", room)));
            }
            rooms.insert(room.clone(), row.clone());
        }
        info!("Room created");
        self.subscribers.notify(&room, RoomEvent::Changed(row));
        Ok(())
    }

    #[instrument(skip(self))]
    async fn fetch(&self, room: &RoomId) -> Result<Option<StoredRow>, StoreError> {
        let row = self
            .rooms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(room)
            .cloned();
        debug!(found = row.is_some(), "Fetched room");
        Ok(row)
    }

    #[instrument(skip(self, update))]
    async fn update(&self, room: &RoomId, update: RowUpdate) -> Result<StoredRow, StoreError> {
        let row = {
            let mut rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
            let row = rooms
                .get_mut(room)
                .ok_or_else(|| StoreError::new(format!("Room {} does not exist", room)))?;
            update.apply_to(row);
            row.clone()
        };
        debug!("Room updated");
        self.subscribers.notify(room, RoomEvent::Changed(row.clone()));
        Ok(row)
    }

    #[instrument(skip(self, on_change))]
    async fn subscribe(
        &self,
        room: &RoomId,
        on_change: ChangeCallback,
    ) -> Result<SubscriptionHandle, StoreError> {
        Ok(self.subscribers.add(room, on_change))
    }

    #[instrument(skip(self))]
    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), StoreError> {
        if !self.subscribers.remove(handle) {
            debug!("Unknown subscription handle");
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn broadcast(&self, room: &RoomId, signal: PeerSignal) -> Result<(), StoreError> {
        self.subscribers.notify(room, RoomEvent::Signal(signal));
        Ok(())
    }
}
