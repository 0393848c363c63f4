//! Processed track API handlers
//!
//! GET /api/audio/:id/tracks lists derived stems with fresh download URLs.
//! POST /api/audio/:id/tracks is the callback the processing service uses to
//! register a stem it has written to the bucket.

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

use audiofilter_common::db::{NewProcessedTrack, ProcessedTrack};

use crate::db::{audio_files, processed_tracks};
use crate::error::{ApiError, ApiResult};
use crate::storage::ObjectStore;
use crate::AppState;

/// Processed track as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedTrackDto {
    pub id: i64,
    pub audio_file_id: i64,
    pub instrument_type: String,
    /// Presigned URL, generated per response and never stored
    pub download_url: String,
    pub processed_at: DateTime<Utc>,
}

impl ProcessedTrackDto {
    async fn from_track(track: &ProcessedTrack, store: &dyn ObjectStore) -> ApiResult<Self> {
        let download_url = store.presigned_get_url(&track.storage_key).await?;
        Ok(Self {
            id: track.id,
            audio_file_id: track.audio_file_id,
            instrument_type: track.instrument_type.clone(),
            download_url,
            processed_at: track.processed_at,
        })
    }
}

/// POST /api/audio/:id/tracks request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTrackRequest {
    pub instrument_type: String,
    pub storage_key: String,
}

/// GET /api/audio/:id/tracks
///
/// An id without tracks (or without a record at all) yields an empty list.
pub async fn list_processed_tracks(
    State(state): State<AppState>,
    audio_file_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Vec<ProcessedTrackDto>>> {
    let Path(audio_file_id) = audio_file_id?;
    let tracks = processed_tracks::list_for_audio_file(&state.db, audio_file_id).await?;

    let store = state.store.as_ref();
    let dtos = try_join_all(
        tracks
            .iter()
            .map(|track| ProcessedTrackDto::from_track(track, store)),
    )
    .await?;

    Ok(Json(dtos))
}

/// POST /api/audio/:id/tracks
pub async fn register_processed_track(
    State(state): State<AppState>,
    audio_file_id: Result<Path<i64>, PathRejection>,
    request: Result<Json<RegisterTrackRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ProcessedTrackDto>)> {
    let Path(audio_file_id) = audio_file_id?;
    let Json(request) = request?;
    let instrument_type = request.instrument_type.trim();
    let storage_key = request.storage_key.trim();
    if instrument_type.is_empty() || storage_key.is_empty() {
        return Err(ApiError::BadRequest(
            "instrumentType and storageKey are required".to_string(),
        ));
    }

    if audio_files::get(&state.db, audio_file_id).await?.is_none() {
        return Err(ApiError::NotFound(format!(
            "Audio file not found: {}",
            audio_file_id
        )));
    }

    if !state.store.exists(storage_key).await? {
        return Err(ApiError::BadRequest(format!(
            "No stored object for key: {}",
            storage_key
        )));
    }

    let track = processed_tracks::insert(
        &state.db,
        &NewProcessedTrack {
            audio_file_id,
            instrument_type: instrument_type.to_string(),
            storage_key: storage_key.to_string(),
        },
    )
    .await?;

    tracing::info!(
        audio_file_id,
        track_id = track.id,
        instrument = %track.instrument_type,
        "Processed track registered"
    );

    let dto = ProcessedTrackDto::from_track(&track, state.store.as_ref()).await?;
    Ok((StatusCode::CREATED, Json(dto)))
}

/// Build processed track routes
pub fn track_routes() -> Router<AppState> {
    Router::new().route(
        "/api/audio/:id/tracks",
        get(list_processed_tracks).post(register_processed_track),
    )
}
