//! Sqlite persistence for room documents.

mod error;
mod models;
mod schema; // Diesel generated schema - internal use only
mod store;

pub use models::{NewRoomRecord, RoomChanges, RoomRecord};
pub use store::SqliteStore;
