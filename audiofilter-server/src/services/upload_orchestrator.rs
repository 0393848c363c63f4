//! Upload orchestration
//!
//! Store the bytes, record the metadata as PENDING, hand the record to the
//! notifier and return without waiting for it.
//!
//! The object write and the metadata insert are not atomic. If the insert
//! fails the object stays in the bucket; its key is logged so it can be
//! cleaned up.

use std::sync::Arc;

use audiofilter_common::config::UploadPolicy;
use audiofilter_common::db::{AudioFile, NewAudioFile};
use axum::body::Bytes;
use sqlx::SqlitePool;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::processing_notifier::{ProcessingNotifier, ProcessingOutcome};
use crate::db::audio_files;
use crate::storage::{ObjectStore, StorageError};

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// File received from the transport layer
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Upload errors, all raised before the record is visible
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("File is {size} bytes, limit is {max}")]
    TooLarge { size: u64, max: u64 },

    #[error("Content type not allowed: {0}")]
    UnsupportedContentType(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Metadata(#[from] audiofilter_common::Error),
}

/// Result of a successful upload
pub struct UploadReceipt {
    /// Record as persisted; always PENDING
    pub audio_file: AudioFile,
    /// Background processing task
    pub processing: JoinHandle<ProcessingOutcome>,
}

pub struct UploadOrchestrator {
    db: SqlitePool,
    store: Arc<dyn ObjectStore>,
    notifier: ProcessingNotifier,
    policy: UploadPolicy,
}

impl UploadOrchestrator {
    pub fn new(
        db: SqlitePool,
        store: Arc<dyn ObjectStore>,
        notifier: ProcessingNotifier,
        policy: UploadPolicy,
    ) -> Self {
        Self {
            db,
            store,
            notifier,
            policy,
        }
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    pub async fn upload_audio_file(&self, file: IncomingFile) -> Result<UploadReceipt, UploadError> {
        let size = file.data.len() as u64;
        self.check_policy(&file, size)?;

        let storage_key = self
            .store
            .put(file.data, size, &file.content_type, &file.file_name)
            .await?;

        let new_file = NewAudioFile {
            original_file_name: file.file_name,
            storage_key,
            content_type: file.content_type,
            file_size: Some(size as i64),
        };

        let audio_file = match audio_files::insert(&self.db, &new_file).await {
            Ok(audio_file) => audio_file,
            Err(e) => {
                warn!(
                    storage_key = %new_file.storage_key,
                    error = %e,
                    "Metadata insert failed, stored object is orphaned"
                );
                return Err(e.into());
            }
        };

        info!(
            audio_file_id = audio_file.id,
            file_name = %audio_file.original_file_name,
            size,
            "Audio file uploaded"
        );

        // Snapshot taken above, so the caller always sees PENDING
        let processing = self.notifier.spawn(audio_file.clone());

        Ok(UploadReceipt {
            audio_file,
            processing,
        })
    }

    fn check_policy(&self, file: &IncomingFile, size: u64) -> Result<(), UploadError> {
        if !self.policy.allows_size(size) {
            return Err(UploadError::TooLarge {
                size,
                max: self.policy.max_file_size.unwrap_or_default(),
            });
        }
        if !self.policy.allows_content_type(&file.content_type) {
            return Err(UploadError::UnsupportedContentType(file.content_type.clone()));
        }
        Ok(())
    }
}
