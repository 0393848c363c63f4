//! Upload orchestrator tests driven through the service layer directly

mod helpers;

use std::sync::Arc;

use axum::body::Bytes;
use tempfile::TempDir;

use audiofilter_common::config::UploadPolicy;
use audiofilter_common::db::{init_database, ProcessingStatus};
use audiofilter_server::db::audio_files;
use audiofilter_server::services::{
    IncomingFile, ProcessingNotifier, ProcessingOutcome, UploadError, UploadOrchestrator,
};
use audiofilter_server::storage::InMemoryObjectStore;
use helpers::{StubProcessingClient, PRESIGN_EXPIRY, TEST_BUCKET};

async fn setup(
    client: StubProcessingClient,
    policy: UploadPolicy,
) -> (TempDir, sqlx::SqlitePool, Arc<InMemoryObjectStore>, UploadOrchestrator) {
    let temp_dir = TempDir::new().unwrap();
    let db = init_database(&temp_dir.path().join("test.db")).await.unwrap();
    let store = Arc::new(InMemoryObjectStore::new(TEST_BUCKET, PRESIGN_EXPIRY));
    let notifier = ProcessingNotifier::new(db.clone(), Arc::new(client));
    let orchestrator = UploadOrchestrator::new(db.clone(), store.clone(), notifier, policy);
    (temp_dir, db, store, orchestrator)
}

fn wav(size: usize) -> IncomingFile {
    IncomingFile {
        file_name: "song.wav".to_string(),
        content_type: "audio/wav".to_string(),
        data: Bytes::from(vec![0u8; size]),
    }
}

#[tokio::test]
async fn test_receipt_is_pending_and_processing_completes() {
    let (_dir, db, _store, orchestrator) =
        setup(StubProcessingClient::succeeding(), UploadPolicy::default()).await;

    let receipt = orchestrator.upload_audio_file(wav(1000)).await.unwrap();
    assert_eq!(receipt.audio_file.status, ProcessingStatus::Pending);
    assert_eq!(receipt.audio_file.file_size, Some(1000));

    let outcome = receipt.processing.await.unwrap();
    assert_eq!(outcome, ProcessingOutcome::Completed);

    let stored = audio_files::get(&db, receipt.audio_file.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, ProcessingStatus::Completed);
}

#[tokio::test]
async fn test_failed_processing_recorded() {
    let (_dir, db, _store, orchestrator) =
        setup(StubProcessingClient::failing(), UploadPolicy::default()).await;

    let receipt = orchestrator.upload_audio_file(wav(10)).await.unwrap();
    let outcome = receipt.processing.await.unwrap();

    assert_eq!(outcome.final_status(), Some(ProcessingStatus::Failed));
    let stored = audio_files::get(&db, receipt.audio_file.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, ProcessingStatus::Failed);
}

#[tokio::test]
async fn test_policy_checked_before_storage() {
    let policy = UploadPolicy {
        max_file_size: Some(100),
        allowed_content_types: vec!["audio/wav".to_string()],
    };
    let (_dir, db, store, orchestrator) = setup(StubProcessingClient::succeeding(), policy).await;

    let err = orchestrator.upload_audio_file(wav(101)).await.err().unwrap();
    assert!(matches!(err, UploadError::TooLarge { size: 101, max: 100 }));

    let mut text = wav(10);
    text.content_type = "text/plain".to_string();
    let err = orchestrator.upload_audio_file(text).await.err().unwrap();
    assert!(matches!(err, UploadError::UnsupportedContentType(_)));

    // Exactly at the limit is accepted
    let receipt = orchestrator.upload_audio_file(wav(100)).await.unwrap();
    receipt.processing.await.unwrap();

    assert_eq!(store.len().await, 1);
    assert_eq!(audio_files::list_all(&db).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_storage_error_propagates() {
    let (_dir, db, store, orchestrator) =
        setup(StubProcessingClient::succeeding(), UploadPolicy::default()).await;
    store.set_reject_writes(true);

    let err = orchestrator.upload_audio_file(wav(10)).await.err().unwrap();
    assert!(matches!(err, UploadError::Storage(_)));
    assert!(audio_files::list_all(&db).await.unwrap().is_empty());
}
