//! External processing service client
//!
//! The processing service receives a versioned JSON request with a presigned
//! URL it can fetch the audio from:
//!
//! ```json
//! POST {base_url}/process-audio
//! { "contractVersion": 1, "audioFileId": 42, "originalFileName": "song.wav",
//!   "contentType": "audio/wav", "fileSize": 1000, "downloadUrl": "..." }
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use audiofilter_common::config::ProcessingConfig;
use audiofilter_common::db::AudioFile;
use serde::Serialize;
use thiserror::Error;

use crate::storage::{ObjectStore, StorageError};

const USER_AGENT: &str = concat!("audiofilter-server/", env!("CARGO_PKG_VERSION"));

/// Processing request errors
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Network error: {0}")]
    Request(String),

    #[error("Processing service returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Could not share audio with processing service: {0}")]
    DownloadUrl(#[from] StorageError),
}

/// Hands an uploaded file to the processing service
#[async_trait]
pub trait ProcessingClient: Send + Sync {
    async fn request_processing(&self, audio_file: &AudioFile) -> Result<(), ProcessingError>;
}

/// Body of `POST /process-audio`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingRequest {
    pub contract_version: u32,
    pub audio_file_id: i64,
    pub original_file_name: String,
    pub content_type: String,
    pub file_size: Option<i64>,
    pub download_url: String,
}

/// reqwest-based client for the external processing service
pub struct HttpProcessingClient {
    http_client: reqwest::Client,
    endpoint: String,
    contract_version: u32,
    store: Arc<dyn ObjectStore>,
}

impl HttpProcessingClient {
    pub fn new(
        endpoint: String,
        contract_version: u32,
        request_timeout: Option<Duration>,
        store: Arc<dyn ObjectStore>,
    ) -> Result<Self, ProcessingError> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| ProcessingError::Request(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint,
            contract_version,
            store,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ProcessingClient for HttpProcessingClient {
    async fn request_processing(&self, audio_file: &AudioFile) -> Result<(), ProcessingError> {
        let download_url = self.store.presigned_get_url(&audio_file.storage_key).await?;

        let request = ProcessingRequest {
            contract_version: self.contract_version,
            audio_file_id: audio_file.id,
            original_file_name: audio_file.original_file_name.clone(),
            content_type: audio_file.content_type.clone(),
            file_size: audio_file.file_size,
            download_url,
        };

        tracing::debug!(
            audio_file_id = audio_file.id,
            endpoint = %self.endpoint,
            "Sending processing request"
        );

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProcessingError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProcessingError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

/// Stand-in used when no processing service is configured; always succeeds
pub struct NoopProcessingClient;

#[async_trait]
impl ProcessingClient for NoopProcessingClient {
    async fn request_processing(&self, audio_file: &AudioFile) -> Result<(), ProcessingError> {
        tracing::debug!(
            audio_file_id = audio_file.id,
            "No processing service configured, skipping request"
        );
        Ok(())
    }
}

/// Pick the client for the configured processing service
pub fn build_processing_client(
    config: &ProcessingConfig,
    store: Arc<dyn ObjectStore>,
) -> Result<Arc<dyn ProcessingClient>, ProcessingError> {
    match config.endpoint_url() {
        Some(endpoint) => {
            let client = HttpProcessingClient::new(
                endpoint,
                config.contract_version,
                config.request_timeout_secs.map(Duration::from_secs),
                store,
            )?;
            tracing::info!("Processing requests go to {}", client.endpoint());
            Ok(Arc::new(client))
        }
        None => {
            tracing::warn!("processing.base_url not set; uploads complete without processing");
            Ok(Arc::new(NoopProcessingClient))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audiofilter_common::db::ProcessingStatus;

    #[test]
    fn test_request_serializes_camel_case() {
        let request = ProcessingRequest {
            contract_version: 1,
            audio_file_id: 42,
            original_file_name: "song.wav".to_string(),
            content_type: "audio/wav".to_string(),
            file_size: Some(1000),
            download_url: "http://minio/audio/song.wav?sig".to_string(),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "contractVersion": 1,
                "audioFileId": 42,
                "originalFileName": "song.wav",
                "contentType": "audio/wav",
                "fileSize": 1000,
                "downloadUrl": "http://minio/audio/song.wav?sig",
            })
        );
    }

    #[tokio::test]
    async fn test_noop_client_succeeds() {
        let audio_file = AudioFile {
            id: 1,
            original_file_name: "song.wav".to_string(),
            storage_key: "k".to_string(),
            content_type: "audio/wav".to_string(),
            file_size: None,
            uploaded_at: chrono::Utc::now(),
            status: ProcessingStatus::Processing,
        };
        NoopProcessingClient
            .request_processing(&audio_file)
            .await
            .unwrap();
    }
}
