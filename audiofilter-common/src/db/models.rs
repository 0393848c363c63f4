//! Database models
//!
//! `AudioFile` is the root record; `ProcessedTrack` rows hang off it and are
//! meaningless without their parent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Processing lifecycle of an uploaded file
///
/// Legal transitions: PENDING → PROCESSING → {COMPLETED, FAILED}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProcessingStatus {
    /// Stored, processing not started yet
    Pending,
    /// External service has been asked to process the file
    Processing,
    /// Processing request accepted
    Completed,
    /// Processing request failed
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "PENDING",
            ProcessingStatus::Processing => "PROCESSING",
            ProcessingStatus::Completed => "COMPLETED",
            ProcessingStatus::Failed => "FAILED",
        }
    }

    pub fn can_transition_to(&self, next: ProcessingStatus) -> bool {
        matches!(
            (self, next),
            (ProcessingStatus::Pending, ProcessingStatus::Processing)
                | (ProcessingStatus::Processing, ProcessingStatus::Completed)
                | (ProcessingStatus::Processing, ProcessingStatus::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessingStatus::Completed | ProcessingStatus::Failed)
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ProcessingStatus::Pending),
            "PROCESSING" => Ok(ProcessingStatus::Processing),
            "COMPLETED" => Ok(ProcessingStatus::Completed),
            "FAILED" => Ok(ProcessingStatus::Failed),
            other => Err(Error::Internal(format!("Unknown processing status: {}", other))),
        }
    }
}

/// Uploaded audio file metadata (`audio_files` row)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFile {
    pub id: i64,
    pub original_file_name: String,
    /// Object store key; never exposed over the API
    pub storage_key: String,
    pub content_type: String,
    pub file_size: Option<i64>,
    pub uploaded_at: DateTime<Utc>,
    pub status: ProcessingStatus,
}

/// Fields supplied by the caller when creating an `AudioFile`.
/// Id, timestamp and initial status are assigned on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAudioFile {
    pub original_file_name: String,
    pub storage_key: String,
    pub content_type: String,
    pub file_size: Option<i64>,
}

/// Derived per-instrument asset (`processed_tracks` row)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedTrack {
    pub id: i64,
    pub audio_file_id: i64,
    /// Stem label, e.g. "vocals", "drums"
    pub instrument_type: String,
    pub storage_key: String,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProcessedTrack {
    pub audio_file_id: i64,
    pub instrument_type: String,
    pub storage_key: String,
}
