//! Axum HTTP API server for the highlight clip pipeline.
//!
//! This crate provides:
//! - `POST /process-video` running one pipeline request per call
//! - Clip retrieval with HTTP range support
//! - Liveness and readiness probes
//! - Per-IP rate limiting and security headers
//! - Prometheus metrics
//! - Background eviction of expired clips

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::ScratchSweeper;
pub use state::AppState;
