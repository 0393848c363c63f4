//! # AudioFilter Common Library
//!
//! Shared code for the AudioFilter services including:
//! - Database schema initialization and record models
//! - Processing status state machine
//! - Configuration loading
//! - Error types and timestamp helpers

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
