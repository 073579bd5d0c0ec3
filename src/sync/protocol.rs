//! Optimistic document sync: read-merge-write pushes and unpacked change
//! notifications.
//!
//! A push re-reads the stored blob right before merging, which narrows but
//! does not close the lost-update window: two writers that fetch the same
//! snapshot both succeed and the later blob wins whole. The blob's write
//! counter lets a pusher notice that it merged against a snapshot newer than
//! the one it last observed; the write still goes through.

use crate::RoomId;
use crate::session::{SessionState, StatePatch};
use crate::sync::{
    DocumentStore, PeerSignal, RoomEvent, SubscriptionHandle, SyncError, blob_version, pack,
    pack_new, unpack,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Notification delivered to protocol subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Latest full state of the room.
    State(Box<SessionState>),
    /// A peer media signal.
    Peer(PeerSignal),
}

/// Outcome of a push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushReceipt {
    /// Blob write counter after the push.
    pub version: u64,
    /// The merge ran against a blob another writer had already changed
    /// since the pusher last observed it.
    pub stale: bool,
}

/// Sync protocol bound to one document store.
#[derive(Debug)]
pub struct DocumentSync<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for DocumentSync<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: DocumentStore + ?Sized + 'static> DocumentSync<S> {
    /// Wraps a store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Writes a brand-new room, returning its write counter.
    ///
    /// # Errors
    ///
    /// Store failures, including an existing room with the same id.
    #[instrument(skip(self, state))]
    pub async fn create(&self, room: &RoomId, state: &SessionState) -> Result<u64, SyncError> {
        let row = pack_new(room, state)?;
        let version = blob_version(row.data());
        self.store.create(row).await?;
        info!(version, "Room document created");
        Ok(version)
    }

    /// Reads and unpacks the room, `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Store failures or an undecodable blob.
    #[instrument(skip(self))]
    pub async fn fetch(&self, room: &RoomId) -> Result<Option<SessionState>, SyncError> {
        match self.store.fetch(room).await? {
            Some(row) => Ok(Some(unpack(&row)?)),
            None => {
                debug!("Room not found");
                Ok(None)
            }
        }
    }

    /// Merges `patch` into the latest stored blob and writes it back.
    ///
    /// `observed_version` is the write counter of the state the patch was
    /// computed from; a mismatch with the freshly fetched blob is reported as
    /// stale but not prevented.
    ///
    /// # Errors
    ///
    /// [`SyncError::RoomNotFound`] if the room vanished, otherwise store or
    /// codec failures.
    #[instrument(skip(self, patch))]
    pub async fn push(
        &self,
        room: &RoomId,
        patch: &StatePatch,
        observed_version: u64,
    ) -> Result<PushReceipt, SyncError> {
        if patch.is_empty() {
            debug!("Empty patch, nothing to push");
            return Ok(PushReceipt {
                version: observed_version,
                stale: false,
            });
        }
        let current = self
            .store
            .fetch(room)
            .await?
            .ok_or_else(|| SyncError::RoomNotFound(room.clone()))?;
        let current_version = blob_version(current.data());
        let stale = current_version != observed_version;
        if stale {
            warn!(
                observed_version,
                current_version, "Merging against a newer snapshot, concurrent write possible"
            );
        }

        let update = pack(patch, current.data())?;
        let written = self.store.update(room, update).await?;
        let version = blob_version(written.data());
        debug!(version, "Patch pushed");
        Ok(PushReceipt { version, stale })
    }

    /// Delivers every remote change to `on_event`, fully unpacked.
    ///
    /// Right after registering, the current state is fetched and delivered
    /// once, covering changes made between joining and subscribing.
    ///
    /// # Errors
    ///
    /// Store failures while registering or during the initial fetch. A failed
    /// initial fetch leaves nothing registered.
    #[instrument(skip(self, on_event))]
    pub async fn subscribe<F>(
        &self,
        room: &RoomId,
        on_event: F,
    ) -> Result<SubscriptionHandle, SyncError>
    where
        F: Fn(SyncEvent) + Send + Sync + 'static,
    {
        let on_event = Arc::new(on_event);
        let forward = Arc::clone(&on_event);
        let handle = self
            .store
            .subscribe(
                room,
                Arc::new(move |event: RoomEvent| match event {
                    RoomEvent::Changed(row) => match unpack(&row) {
                        Ok(state) => forward(SyncEvent::State(Box::new(state))),
                        Err(e) => warn!(error = %e, "Dropping undecodable change"),
                    },
                    RoomEvent::Signal(signal) => forward(SyncEvent::Peer(signal)),
                }),
            )
            .await?;

        match self.fetch(room).await {
            Ok(Some(state)) => on_event(SyncEvent::State(Box::new(state))),
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Initial fetch failed, dropping subscription");
                self.store.unsubscribe(handle).await?;
                return Err(e);
            }
        }
        info!(handle = handle.id(), "Subscribed to room");
        Ok(handle)
    }

    /// Stops delivering events for `handle`.
    ///
    /// # Errors
    ///
    /// Store failures.
    #[instrument(skip(self))]
    pub async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), SyncError> {
        self.store.unsubscribe(handle).await?;
        Ok(())
    }

    /// Broadcasts a peer signal on the room channel.
    ///
    /// # Errors
    ///
    /// Store failures.
    #[instrument(skip(self))]
    pub async fn signal(&self, room: &RoomId, signal: PeerSignal) -> Result<(), SyncError> {
        self.store.broadcast(room, signal).await?;
        Ok(())
    }
}
