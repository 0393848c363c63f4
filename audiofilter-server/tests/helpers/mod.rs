//! Shared test utilities for audiofilter-server integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;

use audiofilter_common::config::UploadPolicy;
use audiofilter_common::db::{init_database, AudioFile};
use audiofilter_server::services::{ProcessingClient, ProcessingError};
use audiofilter_server::storage::InMemoryObjectStore;
use audiofilter_server::{build_router, AppState};

pub const BOUNDARY: &str = "audiofilter-test-boundary";
pub const TEST_BUCKET: &str = "audio-files";
pub const PRESIGN_EXPIRY: Duration = Duration::from_secs(3600);

/// Processing client that records every request and answers as configured
#[derive(Default)]
pub struct StubProcessingClient {
    fail: bool,
    calls: Mutex<Vec<i64>>,
}

impl StubProcessingClient {
    pub fn succeeding() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<i64> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessingClient for StubProcessingClient {
    async fn request_processing(&self, audio_file: &AudioFile) -> Result<(), ProcessingError> {
        self.calls.lock().unwrap().push(audio_file.id);
        if self.fail {
            Err(ProcessingError::Rejected {
                status: 503,
                body: "separator unavailable".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

/// Fully wired application backed by a temp database and in-memory store
///
/// `_temp_dir` must outlive the pool.
pub struct TestApp {
    pub _temp_dir: TempDir,
    pub db: SqlitePool,
    pub store: Arc<InMemoryObjectStore>,
    pub processing: Arc<StubProcessingClient>,
    pub router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with(StubProcessingClient::succeeding(), UploadPolicy::default()).await
    }

    pub async fn with(processing: StubProcessingClient, policy: UploadPolicy) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let db = init_database(&temp_dir.path().join("test.db")).await.unwrap();
        let store = Arc::new(InMemoryObjectStore::new(TEST_BUCKET, PRESIGN_EXPIRY));
        let processing = Arc::new(processing);

        let state = AppState::new(db.clone(), store.clone(), processing.clone(), policy);
        let router = build_router(state);

        Self {
            _temp_dir: temp_dir,
            db,
            store,
            processing,
            router,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> Response<Body> {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn upload(&self, file_name: &str, content_type: &str, data: &[u8]) -> Response<Body> {
        self.send(upload_request(file_name, content_type, data)).await
    }

    /// Poll an audio file until processing reaches a terminal status
    pub async fn wait_for_terminal_status(&self, id: i64) -> String {
        for _ in 0..200 {
            let body = extract_json(self.get(&format!("/api/audio/{}", id)).await).await;
            let status = body["status"].as_str().unwrap_or_default().to_string();
            if status == "COMPLETED" || status == "FAILED" {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("audio file {} never reached a terminal status", id);
    }
}

/// Build a multipart/form-data body with a single `file` part
pub fn multipart_body(file_name: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload_request(file_name: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/audio/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(file_name, content_type, data)))
        .unwrap()
}

/// Extract JSON body from response
pub async fn extract_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}
