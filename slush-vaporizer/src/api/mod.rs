//! HTTP API handlers for slush-vaporizer

pub mod health;
pub mod jobs;
pub mod presets;
pub mod sse;

pub use health::health_routes;
pub use jobs::job_routes;
pub use presets::preset_routes;
pub use sse::event_stream;
