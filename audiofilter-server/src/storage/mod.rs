//! Object store client
//!
//! Raw audio bytes and derived stems live in a bucket-oriented store. The
//! metadata tables only keep the object key.

pub mod memory;
pub mod s3;

use async_trait::async_trait;
use axum::body::Bytes;
use thiserror::Error;
use uuid::Uuid;

pub use memory::InMemoryObjectStore;
pub use s3::S3ObjectStore;

/// Object store errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Backend rejected the write (network, missing bucket, quota)
    #[error("Could not store the file: {0}")]
    Write(String),

    /// Could not check for or read an object
    #[error("Could not read object metadata: {0}")]
    Read(String),

    /// Key was never written
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Signing a download URL failed
    #[error("Could not generate URL: {0}")]
    Url(String),
}

/// Bucket-oriented storage backend
///
/// Every call is a single attempt; errors go straight back to the caller.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` under a freshly generated key derived from `suggested_name`
    /// and return that key.
    async fn put(
        &self,
        data: Bytes,
        size: u64,
        content_type: &str,
        suggested_name: &str,
    ) -> Result<String, StorageError>;

    /// Whether an object exists under `key`
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Time-limited, credential-free GET URL for an existing object
    async fn presigned_get_url(&self, key: &str) -> Result<String, StorageError>;

    /// Short backend label for logs
    fn backend_name(&self) -> &'static str;
}

/// Build a unique object key: `<uuid-v4>_<sanitized name>`.
///
/// Identical content uploaded twice gets two keys.
pub fn generate_object_key(suggested_name: &str) -> String {
    format!("{}_{}", Uuid::new_v4(), sanitize_file_name(suggested_name))
}

/// Reduce a client-supplied file name to characters that are safe in an
/// object key and in a URL path.
fn sanitize_file_name(name: &str) -> String {
    // Browsers on Windows may send the full client path
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}
