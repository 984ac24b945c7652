//! HTTP front end and process wiring for driveconv.

pub mod api;
pub mod bootstrap;
pub mod metrics;
pub mod state;
pub mod telemetry;

pub use api::create_router;
pub use state::AppState;
