//! Database initialization tests
//!
//! Verifies first-run creation, idempotent re-initialization and the
//! constraints the server relies on (unique storage keys, status CHECK,
//! foreign key from processed_tracks to audio_files).

use audiofilter_common::db::init_database;
use sqlx::Row;
use tempfile::TempDir;

#[tokio::test]
async fn test_creates_database_and_parent_directories() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("audiofilter.db");

    let pool = init_database(&db_path).await.expect("Should create database");
    assert!(db_path.exists());

    let tables: Vec<String> = sqlx::query(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(&pool)
    .await
    .unwrap()
    .iter()
    .map(|row| row.get::<String, _>("name"))
    .collect();

    assert_eq!(tables, vec!["audio_files", "processed_tracks"]);
}

#[tokio::test]
async fn test_reinitialization_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("audiofilter.db");

    let pool = init_database(&db_path).await.unwrap();
    sqlx::query(
        "INSERT INTO audio_files (original_file_name, storage_key, content_type, uploaded_at) \
         VALUES ('a.wav', 'k1', 'audio/wav', '2024-01-01T00:00:00Z')",
    )
    .execute(&pool)
    .await
    .unwrap();
    pool.close().await;

    let pool = init_database(&db_path).await.expect("Second init should succeed");
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audio_files")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1, "Existing rows must survive re-initialization");
}

#[tokio::test]
async fn test_new_rows_default_to_pending() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("db.sqlite")).await.unwrap();

    sqlx::query(
        "INSERT INTO audio_files (original_file_name, storage_key, content_type, uploaded_at) \
         VALUES ('a.wav', 'k1', 'audio/wav', '2024-01-01T00:00:00Z')",
    )
    .execute(&pool)
    .await
    .unwrap();

    let status: String = sqlx::query_scalar("SELECT status FROM audio_files")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(status, "PENDING");
}

#[tokio::test]
async fn test_schema_constraints() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("db.sqlite")).await.unwrap();

    let insert = |key: &'static str, status: &'static str| {
        sqlx::query(
            "INSERT INTO audio_files (original_file_name, storage_key, content_type, uploaded_at, status) \
             VALUES ('a.wav', ?, 'audio/wav', '2024-01-01T00:00:00Z', ?)",
        )
        .bind(key)
        .bind(status)
    };

    insert("k1", "PENDING").execute(&pool).await.unwrap();
    assert!(
        insert("k1", "PENDING").execute(&pool).await.is_err(),
        "storage_key must be unique"
    );
    assert!(
        insert("k2", "QUEUED").execute(&pool).await.is_err(),
        "status outside the enum must be rejected"
    );

    let orphan = sqlx::query(
        "INSERT INTO processed_tracks (audio_file_id, instrument_type, storage_key, processed_at) \
         VALUES (999, 'vocals', 'stem', '2024-01-01T00:00:00Z')",
    )
    .execute(&pool)
    .await;
    assert!(orphan.is_err(), "tracks must reference an existing audio file");
}
