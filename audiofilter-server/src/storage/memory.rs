//! Process-local object store
//!
//! Used for local development (`storage.backend = "memory"`) and tests.
//! Contents are lost on restart.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use tokio::sync::RwLock;

use super::{generate_object_key, ObjectStore, StorageError};

/// Object held by [`InMemoryObjectStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Bytes,
    pub content_type: String,
}

pub struct InMemoryObjectStore {
    bucket: String,
    presign_expiry: Duration,
    objects: RwLock<HashMap<String, StoredObject>>,
    /// Simulates an unavailable backend: every `put` fails while set
    reject_writes: AtomicBool,
}

impl InMemoryObjectStore {
    pub fn new(bucket: impl Into<String>, presign_expiry: Duration) -> Self {
        Self {
            bucket: bucket.into(),
            presign_expiry,
            objects: RwLock::new(HashMap::new()),
            reject_writes: AtomicBool::new(false),
        }
    }

    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Store an object under an exact key (derived stems in tests)
    pub async fn insert(&self, key: &str, data: Bytes, content_type: &str) {
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
    }

    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(
        &self,
        data: Bytes,
        size: u64,
        content_type: &str,
        suggested_name: &str,
    ) -> Result<String, StorageError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Write(format!(
                "bucket '{}' is not accepting writes",
                self.bucket
            )));
        }
        if data.len() as u64 != size {
            return Err(StorageError::Write(format!(
                "declared size {} does not match {} bytes received",
                size,
                data.len()
            )));
        }

        let key = generate_object_key(suggested_name);
        self.insert(&key, data, content_type).await;
        Ok(key)
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.objects.read().await.contains_key(key))
    }

    async fn presigned_get_url(&self, key: &str) -> Result<String, StorageError> {
        if !self.exists(key).await? {
            return Err(StorageError::NotFound(key.to_string()));
        }
        Ok(format!(
            "memory://{}/{}?expires_in={}",
            self.bucket,
            key,
            self.presign_expiry.as_secs()
        ))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
