//! Sqlite-backed document store.

use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info, instrument, warn};

use crate::RoomId;
use crate::db::{NewRoomRecord, RoomChanges, RoomRecord, schema};
use crate::sync::{
    ChangeCallback, DocumentStore, PeerSignal, RoomEvent, RowUpdate, StoreError, StoredRow,
    Subscribers, SubscriptionHandle,
};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Document store persisting rooms in a sqlite database.
///
/// Change notifications reach subscribers registered through this same
/// store value only; writes from other processes are seen on the next fetch.
#[derive(Debug)]
pub struct SqliteStore {
    db_path: String,
    subscribers: Subscribers,
}

impl SqliteStore {
    /// Opens the database at `db_path`, applying pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the database cannot be opened or migrated.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn open(db_path: String) -> Result<Self, StoreError> {
        info!(path = %db_path, "Opening SqliteStore");
        let store = Self {
            db_path,
            subscribers: Subscribers::new(),
        };
        let mut conn = store.connection()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| StoreError::new(format!("Migrations failed: {}", e)))?;
        debug!(count = applied.len(), "Migrations applied");
        Ok(store)
    }

    /// Establishes a database connection.
    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, StoreError> {
        debug!(path = %self.db_path, "Establishing connection");
        SqliteConnection::establish(&self.db_path)
            .map_err(|e| StoreError::new(format!("Failed to connect to '{}': {}", self.db_path, e)))
    }

    #[instrument(skip(self))]
    fn load(&self, room: &RoomId) -> Result<Option<StoredRow>, StoreError> {
        let mut conn = self.connection()?;
        let record = schema::rooms::table
            .find(room.as_str())
            .select(RoomRecord::as_select())
            .first(&mut conn)
            .optional()?;
        record.map(|r| r.to_row()).transpose()
    }

    #[instrument(skip(self, row), fields(room = %row.room_id()))]
    fn insert(&self, row: &StoredRow) -> Result<(), StoreError> {
        let mut conn = self.connection()?;
        diesel::insert_into(schema::rooms::table)
            .values(&NewRoomRecord::from_row(row))
            .execute(&mut conn)?;
        info!("Room stored");
        Ok(())
    }

    #[instrument(skip(self, update))]
    fn write(&self, room: &RoomId, update: &RowUpdate) -> Result<StoredRow, StoreError> {
        let mut conn = self.connection()?;
        let record = diesel::update(schema::rooms::table.find(room.as_str()))
            .set(&RoomChanges::from_update(update))
            .returning(RoomRecord::as_returning())
            .get_result(&mut conn)
            .optional()?;
        match record {
            Some(record) => record.to_row(),
            None => {
                warn!("Update for missing room");
                Err(StoreError::new(format!("Room {} does not exist", room)))
            }
        }
    }
}

#[async_trait::async_trait]
impl DocumentStore for SqliteStore {
    async fn create(&self, row: StoredRow) -> Result<(), StoreError> {
        self.insert(&row)?;
        let room = row.room_id().clone();
        self.subscribers.notify(&room, RoomEvent::Changed(row));
        Ok(())
    }

    async fn fetch(&self, room: &RoomId) -> Result<Option<StoredRow>, StoreError> {
        Ok(self.load(room)?)
    }

    async fn update(&self, room: &RoomId, update: RowUpdate) -> Result<StoredRow, StoreError> {
        let row = self.write(room, &update)?;
        self.subscribers.notify(room, RoomEvent::Changed(row.clone()));
        Ok(row)
    }

    async fn subscribe(
        &self,
        room: &RoomId,
        on_change: ChangeCallback,
    ) -> Result<SubscriptionHandle, StoreError> {
        Ok(self.subscribers.add(room, on_change))
    }

    async fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<(), StoreError> {
        self.subscribers.remove(handle);
        Ok(())
    }

    async fn broadcast(&self, room: &RoomId, signal: PeerSignal) -> Result<(), StoreError> {
        self.subscribers.notify(room, RoomEvent::Signal(signal));
        Ok(())
    }
}
