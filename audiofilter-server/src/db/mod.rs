//! Metadata store queries
//!
//! Schema creation lives in `audiofilter_common::db::init_database`.

pub mod audio_files;
pub mod processed_tracks;
