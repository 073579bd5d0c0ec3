//! Tests for the sqlite document store.

use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use xiangqi_room::{
    ClientId, DocumentStore, DocumentSync, PeerSignal, PieceId, Position, RoomEvent, RoomId,
    RowUpdate, SeatRequest, SessionState, Side, SqliteStore, StoreError, StoredRow,
};

fn t0() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).expect("valid timestamp")
}

fn room() -> RoomId {
    "1234".parse().expect("valid room code")
}

/// Opens a store on a temporary database file. The file handle must stay in
/// scope to keep the database alive.
fn setup_test_db() -> (NamedTempFile, Arc<SqliteStore>) {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();
    let store = SqliteStore::open(db_path).expect("Failed to open store");
    (db_file, Arc::new(store))
}

#[test]
fn test_open_failure_reports_store_error() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("missing").join("rooms.db");
    let result: Result<SqliteStore, StoreError> =
        SqliteStore::open(db_path.to_str().expect("Invalid path").to_string());
    let err = result.expect_err("Opening inside a missing directory should fail");
    assert!(err.message.contains("Failed to connect"), "{}", err);
    assert!(err.file.ends_with("store.rs"), "{}", err);
}

#[tokio::test]
async fn test_create_and_fetch_row() {
    let (_db, store) = setup_test_db();
    let row = StoredRow::new(room(), Side::Red, None, json!({ "meta": { "version": 1 } }));
    store.create(row.clone()).await.expect("Create failed");

    let fetched = store.fetch(&room()).await.expect("Fetch failed");
    assert_eq!(fetched, Some(row));
}

#[tokio::test]
async fn test_fetch_unknown_room() {
    let (_db, store) = setup_test_db();
    let fetched = store.fetch(&room()).await.expect("Fetch failed");
    assert!(fetched.is_none());
}

#[tokio::test]
async fn test_duplicate_room_fails() {
    let (_db, store) = setup_test_db();
    let row = StoredRow::new(room(), Side::Red, None, json!({}));
    store.create(row.clone()).await.expect("First create failed");
    assert!(store.create(row).await.is_err(), "Duplicate room should fail");
}

#[tokio::test]
async fn test_update_touches_only_given_columns() {
    let (_db, store) = setup_test_db();
    store
        .create(StoredRow::new(room(), Side::Black, None, json!({})))
        .await
        .expect("Create failed");

    let written = store
        .update(&room(), RowUpdate::new(None, Some(Some(Side::Red)), json!({ "a": 1 })))
        .await
        .expect("Update failed");
    assert_eq!(*written.turn(), Side::Black);
    assert_eq!(*written.winner(), Some(Side::Red));
    assert_eq!(written.data(), &json!({ "a": 1 }));

    let cleared = store
        .update(&room(), RowUpdate::new(Some(Side::Red), Some(None), json!({ "a": 2 })))
        .await
        .expect("Update failed");
    assert_eq!(*cleared.turn(), Side::Red);
    assert_eq!(*cleared.winner(), None);
}

#[tokio::test]
async fn test_update_unknown_room_fails() {
    let (_db, store) = setup_test_db();
    let result = store
        .update(&room(), RowUpdate::new(Some(Side::Red), None, json!({})))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_subscribers_see_writes_and_signals() {
    let (_db, store) = setup_test_db();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    store
        .subscribe(
            &room(),
            Arc::new(move |event: RoomEvent| sink.lock().unwrap().push(event)),
        )
        .await
        .expect("Subscribe failed");

    store
        .create(StoredRow::new(room(), Side::Red, None, json!({})))
        .await
        .expect("Create failed");
    store
        .broadcast(
            &room(),
            PeerSignal::RequestConnection {
                from: ClientId::new("red"),
            },
        )
        .await
        .expect("Broadcast failed");

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(matches!(seen[0], RoomEvent::Changed(_)));
    assert!(matches!(seen[1], RoomEvent::Signal(_)));
}

#[tokio::test]
async fn test_session_survives_reopen() {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();

    let sync = DocumentSync::new(Arc::new(
        SqliteStore::open(db_path.clone()).expect("Failed to open store"),
    ));
    let mut state = SessionState::open(ClientId::new("red"), t0());
    let version = sync.create(&room(), &state).await.expect("Create failed");
    let patch = state
        .join_seat(&ClientId::new("black"), SeatRequest::Side(Side::Black), t0())
        .expect("join");
    let receipt = sync.push(&room(), &patch, version).await.expect("Push failed");
    let patch = state
        .attempt_move(
            &ClientId::new("red"),
            &PieceId::new("r-horse-1"),
            Position::new(6, 7),
            t0(),
        )
        .expect("legal move");
    sync.push(&room(), &patch, receipt.version)
        .await
        .expect("Push failed");
    drop(sync);

    let reopened = DocumentSync::new(Arc::new(
        SqliteStore::open(db_path).expect("Failed to reopen store"),
    ));
    let restored = reopened
        .fetch(&room())
        .await
        .expect("Fetch failed")
        .expect("Room persisted");
    assert_eq!(restored.board(), state.board());
    assert_eq!(restored.history(), state.history());
    assert_eq!(restored.players(), state.players());
    assert_eq!(*restored.turn(), Side::Black);
    assert_eq!(*restored.meta().version(), 3);
}
