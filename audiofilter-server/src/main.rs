//! audiofilter-server - audio upload backend
//!
//! Startup order: configuration, tracing, database, object store,
//! processing client, HTTP server.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use audiofilter_common::config::{AppConfig, StorageBackend};
use audiofilter_common::db::init_database;
use audiofilter_server::services::build_processing_client;
use audiofilter_server::storage::{InMemoryObjectStore, ObjectStore, S3ObjectStore};
use audiofilter_server::{build_router, AppState};

/// Bucket name used by the in-memory backend when none is configured
const DEFAULT_MEMORY_BUCKET: &str = "audio-files";

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "audiofilter-server")]
#[command(about = "Audio upload and processing backend", long_about = None)]
#[command(version)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, env = "AUDIOFILTER_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address (overrides config and environment)
    #[arg(short, long)]
    bind: Option<String>,

    /// Database path (overrides config and environment)
    #[arg(short, long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref()).context("Invalid configuration")?;
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }
    if let Some(database) = args.database {
        config.database.path = database;
    }

    // RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!(
        "Starting audiofilter-server v{}",
        env!("CARGO_PKG_VERSION")
    );
    if let Some(path) = &args.config {
        info!("Configuration file: {}", path.display());
    }

    info!("Database path: {}", config.database.path.display());
    let pool = match init_database(&config.database.path).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e.into());
        }
    };

    let presign_expiry = Duration::from_secs(config.storage.presign_expiry_secs);
    let store: Arc<dyn ObjectStore> = match config.storage.backend {
        StorageBackend::S3 => {
            let settings = config.storage.s3_settings()?;
            info!(
                "Object store: {} (bucket {})",
                settings.endpoint, settings.bucket
            );
            Arc::new(S3ObjectStore::new(&settings, presign_expiry).await)
        }
        StorageBackend::Memory => {
            let bucket = config
                .storage
                .bucket
                .clone()
                .unwrap_or_else(|| DEFAULT_MEMORY_BUCKET.to_string());
            tracing::warn!("Using in-memory object store; uploads are lost on restart");
            Arc::new(InMemoryObjectStore::new(bucket, presign_expiry))
        }
    };

    let processing_client = build_processing_client(&config.processing, store.clone())
        .context("Failed to build processing client")?;

    let state = AppState::new(pool, store, processing_client, config.upload.clone());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    info!("audiofilter-server listening on http://{}", config.server.bind_addr);
    info!("Health check: http://{}/health", config.server.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("audiofilter-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
