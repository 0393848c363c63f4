//! HTTP API handlers for audiofilter-server

pub mod audio;
pub mod health;
pub mod tracks;

pub use audio::audio_routes;
pub use health::health_routes;
pub use tracks::track_routes;
