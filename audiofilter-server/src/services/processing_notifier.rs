//! Background processing notifier
//!
//! Runs once per upload on its own task:
//! 1. PENDING → PROCESSING, persisted
//! 2. Processing request to the external service
//! 3. PROCESSING → COMPLETED on success, PROCESSING → FAILED on any error
//!
//! Step 3 runs whichever way step 2 ends, including a panic inside the
//! client. Errors never reach the uploader; they only show up as the
//! persisted FAILED status.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use audiofilter_common::db::{AudioFile, ProcessingStatus};
use futures::FutureExt;
use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::processing_client::ProcessingClient;
use crate::db::audio_files;

/// How a notifier run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingOutcome {
    /// Request accepted, record is COMPLETED
    Completed,
    /// Request failed, record is FAILED
    Failed { reason: String },
    /// PROCESSING could not be persisted; record left as it was
    NotStarted { reason: String },
}

impl ProcessingOutcome {
    /// Status the run left the record in, when it changed it
    pub fn final_status(&self) -> Option<ProcessingStatus> {
        match self {
            ProcessingOutcome::Completed => Some(ProcessingStatus::Completed),
            ProcessingOutcome::Failed { .. } => Some(ProcessingStatus::Failed),
            ProcessingOutcome::NotStarted { .. } => None,
        }
    }
}

#[derive(Clone)]
pub struct ProcessingNotifier {
    db: SqlitePool,
    client: Arc<dyn ProcessingClient>,
}

impl ProcessingNotifier {
    pub fn new(db: SqlitePool, client: Arc<dyn ProcessingClient>) -> Self {
        Self { db, client }
    }

    /// Start processing on a background task and return its handle.
    ///
    /// Dropping the handle detaches the task; it keeps running.
    pub fn spawn(&self, audio_file: AudioFile) -> JoinHandle<ProcessingOutcome> {
        let notifier = self.clone();
        tokio::spawn(async move { notifier.run(audio_file).await })
    }

    /// Drive one record through the status machine
    pub async fn run(&self, mut audio_file: AudioFile) -> ProcessingOutcome {
        let id = audio_file.id;

        if let Err(e) = audio_files::transition_status(
            &self.db,
            id,
            ProcessingStatus::Pending,
            ProcessingStatus::Processing,
        )
        .await
        {
            error!(audio_file_id = id, error = %e, "Could not mark audio file PROCESSING");
            return ProcessingOutcome::NotStarted {
                reason: e.to_string(),
            };
        }
        audio_file.status = ProcessingStatus::Processing;
        info!(audio_file_id = id, "Processing started");

        let (final_status, outcome) = match self.request(&audio_file).await {
            Ok(()) => (ProcessingStatus::Completed, ProcessingOutcome::Completed),
            Err(reason) => {
                warn!(audio_file_id = id, error = %reason, "Processing request failed");
                (
                    ProcessingStatus::Failed,
                    ProcessingOutcome::Failed { reason },
                )
            }
        };

        match audio_files::transition_status(
            &self.db,
            id,
            ProcessingStatus::Processing,
            final_status,
        )
        .await
        {
            Ok(()) => info!(audio_file_id = id, status = %final_status, "Processing finished"),
            Err(e) => error!(
                audio_file_id = id,
                status = %final_status,
                error = %e,
                "Could not persist final processing status"
            ),
        }

        outcome
    }

    /// Call the client, turning a panic inside it into an error message
    async fn request(&self, audio_file: &AudioFile) -> Result<(), String> {
        match AssertUnwindSafe(self.client.request_processing(audio_file))
            .catch_unwind()
            .await
        {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(panic) => Err(format!("Processing task panicked: {}", panic_message(&panic))),
        }
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
