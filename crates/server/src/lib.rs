//! HTTP server for shrink.
//!
//! This crate provides:
//! - Anonymous file uploads with sniffed extensions
//! - URL shortening and redirects
//! - Capability-based deletion for both
//! - Webhook notifications and the stale-file sweep

pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod sweep;
pub mod webhooks;

pub use auth::TraceId;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
pub use sweep::{SweepStats, run_sweep, spawn_sweep_task};
pub use webhooks::{NotificationEvent, Notifier};
