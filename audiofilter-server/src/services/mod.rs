//! Upload orchestration and background processing

pub mod processing_client;
pub mod processing_notifier;
pub mod upload_orchestrator;

pub use processing_client::{
    build_processing_client, HttpProcessingClient, NoopProcessingClient, ProcessingClient,
    ProcessingError, ProcessingRequest,
};
pub use processing_notifier::{ProcessingNotifier, ProcessingOutcome};
pub use upload_orchestrator::{IncomingFile, UploadError, UploadOrchestrator, UploadReceipt};
