//! Document sync protocol between the session state and a shared store.

mod codec;
mod error;
mod memory;
mod protocol;
mod store;
mod subscribers;

pub use codec::{blob_version, pack, pack_new, unpack};
pub use error::{StoreError, SyncError};
pub use memory::MemoryStore;
pub use protocol::{DocumentSync, PushReceipt, SyncEvent};
pub use store::{
    ChangeCallback, DocumentStore, PeerSignal, RoomEvent, RowUpdate, StoredRow,
    SubscriptionHandle,
};
pub use subscribers::Subscribers;
