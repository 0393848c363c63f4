//! Configuration loading
//!
//! Resolution follows a fixed priority order:
//! 1. Command-line arguments (applied by the binary after loading)
//! 2. Environment variables (`AUDIOFILTER_*`)
//! 3. TOML config file
//! 4. Compiled defaults
//!
//! Object storage endpoint, credentials and bucket have no compiled defaults;
//! [`AppConfig::validate`] rejects an S3 configuration that leaves any of them out.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// Longest lifetime S3 accepts for a SigV4 presigned URL (7 days)
pub const MAX_PRESIGN_EXPIRY_SECS: u64 = 7 * 24 * 60 * 60;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "AUDIOFILTER_";

/// Top-level application configuration, built once at startup
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub processing: ProcessingConfig,
    pub upload: UploadPolicy,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the HTTP server binds to
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file, created on first run
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("audiofilter.db"),
        }
    }
}

/// Object store implementation selected at startup
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// S3-compatible service (MinIO, AWS S3)
    #[default]
    S3,
    /// Process-local store, contents lost on restart
    Memory,
}

impl FromStr for StorageBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s3" => Ok(StorageBackend::S3),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(Error::Config(format!(
                "Unknown storage backend '{}' (expected 's3' or 'memory')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub bucket: Option<String>,
    pub region: String,
    /// Lifetime of presigned download URLs
    pub presign_expiry_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::S3,
            endpoint: None,
            access_key: None,
            secret_key: None,
            bucket: None,
            region: "us-east-1".to_string(),
            presign_expiry_secs: 3600,
        }
    }
}

/// S3 connection settings after validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Settings {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub region: String,
}

impl StorageConfig {
    /// Extract the S3 settings, failing with the list of missing keys
    pub fn s3_settings(&self) -> Result<S3Settings> {
        let mut missing = Vec::new();
        let mut take = |name: &'static str, value: &Option<String>| -> String {
            match value.as_deref().map(str::trim) {
                Some(v) if !v.is_empty() => v.to_string(),
                _ => {
                    missing.push(name);
                    String::new()
                }
            }
        };

        let endpoint = take("storage.endpoint", &self.endpoint);
        let access_key = take("storage.access_key", &self.access_key);
        let secret_key = take("storage.secret_key", &self.secret_key);
        let bucket = take("storage.bucket", &self.bucket);

        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "S3 storage requires: {}",
                missing.join(", ")
            )));
        }

        Ok(S3Settings {
            endpoint,
            access_key,
            secret_key,
            bucket,
            region: self.region.clone(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Base URL of the external processing service. When unset, the
    /// notification step is skipped and files go straight to COMPLETED.
    pub base_url: Option<String>,
    /// Version tag sent with every processing request
    pub contract_version: u32,
    /// Optional request timeout; requests wait indefinitely when unset
    pub request_timeout_secs: Option<u64>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            contract_version: 1,
            request_timeout_secs: None,
        }
    }
}

impl ProcessingConfig {
    /// Full URL of the processing endpoint, if a service is configured
    pub fn endpoint_url(&self) -> Option<String> {
        self.base_url
            .as_deref()
            .map(|base| format!("{}/process-audio", base.trim_end_matches('/')))
    }
}

/// Upload validation limits. The defaults accept everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UploadPolicy {
    /// Maximum accepted file size in bytes
    pub max_file_size: Option<u64>,
    /// Accepted MIME types; empty means any
    pub allowed_content_types: Vec<String>,
}

impl UploadPolicy {
    pub fn allows_size(&self, size: u64) -> bool {
        self.max_file_size.map_or(true, |max| size <= max)
    }

    /// Compares the MIME essence only, so `audio/wav; codecs=1` matches `audio/wav`
    pub fn allows_content_type(&self, content_type: &str) -> bool {
        if self.allowed_content_types.is_empty() {
            return true;
        }
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        self.allowed_content_types
            .iter()
            .any(|allowed| allowed.trim().eq_ignore_ascii_case(&essence))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing directive, overridden by RUST_LOG
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Parse a TOML document; absent sections fall back to defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load configuration from an optional TOML file, then apply
    /// environment overrides and validate.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut config = match config_file {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("Read {} failed: {}", path.display(), e))
                })?;
                info!("Loaded configuration from {}", path.display());
                Self::from_toml_str(&content)?
            }
            None => {
                debug!("No config file given, using compiled defaults");
                Self::default()
            }
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `AUDIOFILTER_*` environment variables
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary key lookup (environment in production)
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |suffix: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, suffix)).filter(|v| !v.trim().is_empty())
        };

        if let Some(v) = get("BIND_ADDR") {
            self.server.bind_addr = v;
        }
        if let Some(v) = get("DATABASE_PATH") {
            self.database.path = PathBuf::from(v);
        }
        if let Some(v) = get("STORAGE_BACKEND") {
            self.storage.backend = v.parse()?;
        }
        if let Some(v) = get("STORAGE_ENDPOINT") {
            self.storage.endpoint = Some(v);
        }
        if let Some(v) = get("STORAGE_ACCESS_KEY") {
            self.storage.access_key = Some(v);
        }
        if let Some(v) = get("STORAGE_SECRET_KEY") {
            self.storage.secret_key = Some(v);
        }
        if let Some(v) = get("STORAGE_BUCKET") {
            self.storage.bucket = Some(v);
        }
        if let Some(v) = get("STORAGE_REGION") {
            self.storage.region = v;
        }
        if let Some(v) = get("PRESIGN_EXPIRY_SECS") {
            self.storage.presign_expiry_secs = parse_number("PRESIGN_EXPIRY_SECS", &v)?;
        }
        if let Some(v) = get("PROCESSING_URL") {
            self.processing.base_url = Some(v);
        }
        if let Some(v) = get("MAX_FILE_SIZE") {
            self.upload.max_file_size = Some(parse_number("MAX_FILE_SIZE", &v)?);
        }
        if let Some(v) = get("ALLOWED_CONTENT_TYPES") {
            self.upload.allowed_content_types = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = get("LOG_LEVEL") {
            self.logging.level = v;
        }

        Ok(())
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.storage.backend == StorageBackend::S3 {
            self.storage.s3_settings()?;
        }

        if self.storage.presign_expiry_secs == 0
            || self.storage.presign_expiry_secs > MAX_PRESIGN_EXPIRY_SECS
        {
            return Err(Error::Config(format!(
                "storage.presign_expiry_secs must be between 1 and {}",
                MAX_PRESIGN_EXPIRY_SECS
            )));
        }

        if let Some(url) = &self.processing.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::Config(format!(
                    "processing.base_url must be an http(s) URL: {}",
                    url
                )));
            }
        }

        if self.processing.contract_version == 0 {
            return Err(Error::Config(
                "processing.contract_version must be at least 1".to_string(),
            ));
        }

        if self.upload.max_file_size == Some(0) {
            return Err(Error::Config(
                "upload.max_file_size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value.trim().parse().map_err(|_| {
        Error::Config(format!(
            "{}{} must be a non-negative integer, got '{}'",
            ENV_PREFIX, key, value
        ))
    })
}
