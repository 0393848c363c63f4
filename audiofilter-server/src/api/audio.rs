//! Audio file API handlers
//!
//! POST /api/audio/upload, GET /api/audio/:id, GET /api/audio

use axum::{
    extract::multipart::MultipartRejection,
    extract::rejection::PathRejection,
    extract::{Multipart, Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use audiofilter_common::db::{AudioFile, ProcessingStatus};

use crate::db::audio_files;
use crate::error::{ApiError, ApiResult};
use crate::services::upload_orchestrator::{IncomingFile, DEFAULT_CONTENT_TYPE};
use crate::AppState;

/// Multipart field carrying the upload
pub const FILE_FIELD: &str = "file";

/// Audio file as returned to clients (storage key stays internal)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioFileDto {
    pub id: i64,
    pub original_file_name: String,
    pub content_type: String,
    pub file_size: Option<i64>,
    pub uploaded_at: DateTime<Utc>,
    pub status: ProcessingStatus,
}

impl From<&AudioFile> for AudioFileDto {
    fn from(file: &AudioFile) -> Self {
        Self {
            id: file.id,
            original_file_name: file.original_file_name.clone(),
            content_type: file.content_type.clone(),
            file_size: file.file_size,
            uploaded_at: file.uploaded_at,
            status: file.status,
        }
    }
}

/// POST /api/audio/upload
///
/// Multipart upload with a single `file` part. Responds once the file is
/// stored and recorded; processing continues in the background, so the
/// returned status is always PENDING.
pub async fn upload_audio_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<AudioFileDto>> {
    let mut multipart = multipart?;
    let file = read_file_field(&mut multipart).await?;

    tracing::debug!(
        file_name = %file.file_name,
        content_type = %file.content_type,
        size = file.data.len(),
        "Upload received"
    );

    // The processing handle is dropped; clients poll the status instead
    let receipt = state.orchestrator.upload_audio_file(file).await?;

    Ok(Json(AudioFileDto::from(&receipt.audio_file)))
}

/// GET /api/audio/:id
pub async fn get_audio_file(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<AudioFileDto>> {
    let Path(id) = id?;
    let audio_file = audio_files::get(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Audio file not found: {}", id)))?;

    Ok(Json(AudioFileDto::from(&audio_file)))
}

/// GET /api/audio
pub async fn list_audio_files(State(state): State<AppState>) -> ApiResult<Json<Vec<AudioFileDto>>> {
    let files = audio_files::list_all(&state.db).await?;
    Ok(Json(files.iter().map(AudioFileDto::from).collect()))
}

/// Pull the `file` part out of the multipart body, skipping any other parts
async fn read_file_field(multipart: &mut Multipart) -> ApiResult<IncomingFile> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or("upload")
            .to_string();
        let content_type = field
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let data = field.bytes().await?;

        return Ok(IncomingFile {
            file_name,
            content_type,
            data,
        });
    }

    Err(ApiError::BadRequest(format!(
        "Missing multipart field '{}'",
        FILE_FIELD
    )))
}

/// Build audio file routes
pub fn audio_routes() -> Router<AppState> {
    Router::new()
        .route("/api/audio", get(list_audio_files))
        .route("/api/audio/upload", post(upload_audio_file))
        .route("/api/audio/:id", get(get_audio_file))
}
