//! Xiangqi rooms - two-player Chinese chess over a shared document
//!
//! Each participant keeps a cached copy of the session and talks to the
//! others only through one shared row per room.
//!
//! # Architecture
//!
//! - **Session**: replicated state and the state machine that guards it
//! - **Sync**: packing patches into the stored blob and fanning out changes
//! - **Db**: sqlite-backed document store
//! - **Client**: one participant's view of one room
//!
//! Rules and board replay live in the `xiangqi_rules` crate.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use xiangqi_room::{ClientConfig, MemoryStore, RoomClient};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let config = ClientConfig::generate();
//! let client = RoomClient::create_room(&config, store, chrono::Utc::now()).await?;
//! println!("Room {}", client.room());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod config;
mod db;
mod identity;
mod session;
mod sync;

// Crate-level exports - Identity
pub use identity::{ClientId, InvalidRoomId, RoomId};

// Crate-level exports - Configuration
pub use config::{ClientConfig, ConfigError};

// Crate-level exports - Session
pub use session::{
    MetaPatch, PlayerRecord, Players, SeatRequest, SessionError, SessionErrorKind, SessionMeta,
    SessionPhase, SessionRules, SessionState, StatePatch, UndoState,
};

// Crate-level exports - Sync protocol
pub use sync::{
    ChangeCallback, DocumentStore, DocumentSync, MemoryStore, PeerSignal, PushReceipt,
    RoomEvent, RowUpdate, StoreError, StoredRow, Subscribers, SubscriptionHandle, SyncError,
    SyncEvent, blob_version, pack, pack_new, unpack,
};

// Crate-level exports - Persistence
pub use db::SqliteStore;

// Crate-level exports - Client
pub use client::{ActionOutcome, ClientError, RoomClient};

// Crate-level exports - Rules
pub use xiangqi_rules::{Board, Move, MoveError, Piece, PieceId, PieceKind, Position, Side};
