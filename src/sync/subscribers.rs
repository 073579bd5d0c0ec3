//! Per-room callback fan-out shared by the store backends.

use crate::RoomId;
use crate::sync::{ChangeCallback, RoomEvent, SubscriptionHandle};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, instrument};

/// Registry of room subscriptions.
#[derive(Default)]
pub struct Subscribers {
    next: AtomicU64,
    entries: Mutex<HashMap<u64, (RoomId, ChangeCallback)>>,
}

impl Subscribers {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for events on `room`.
    #[instrument(skip(self, callback))]
    pub fn add(&self, room: &RoomId, callback: ChangeCallback) -> SubscriptionHandle {
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, (room.clone(), callback));
        debug!(id, "Subscription added");
        SubscriptionHandle::new(id)
    }

    /// Drops a subscription, reporting whether it existed.
    #[instrument(skip(self))]
    pub fn remove(&self, handle: SubscriptionHandle) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle.id())
            .is_some()
    }

    /// Delivers `event` to every subscriber of `room`.
    ///
    /// Callbacks run after the registry lock is released so they may
    /// subscribe or unsubscribe themselves.
    #[instrument(skip(self, event))]
    pub fn notify(&self, room: &RoomId, event: RoomEvent) {
        let targets: Vec<ChangeCallback> = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|(r, _)| r == room)
            .map(|(_, cb)| cb.clone())
            .collect();
        debug!(count = targets.len(), "Notifying subscribers");
        for callback in targets {
            callback(event.clone());
        }
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no subscription is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscribers")
            .field("count", &self.len())
            .finish()
    }
}
