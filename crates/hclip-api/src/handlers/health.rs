//! Health check handlers.

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use hclip_media::{check_ffmpeg, check_ffprobe, check_ytdlp, MediaResult};

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
    /// Whether moments come from a language model or always from the fallback list
    pub moment_source: String,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub scratch: CheckStatus,
    pub ytdlp: CheckStatus,
    pub ffmpeg: CheckStatus,
    pub ffprobe: CheckStatus,
}

impl ReadinessChecks {
    fn all_ok(&self) -> bool {
        [&self.scratch, &self.ytdlp, &self.ffmpeg, &self.ffprobe]
            .iter()
            .all(|check| check.is_ok())
    }
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl CheckStatus {
    fn ok(latency_ms: u64) -> Self {
        Self {
            status: "ok".to_string(),
            error: None,
            latency_ms: Some(latency_ms),
        }
    }

    fn error(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            error: Some(msg.into()),
            latency_ms: None,
        }
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

fn tool_check(check: impl FnOnce() -> MediaResult<std::path::PathBuf>) -> CheckStatus {
    let start = Instant::now();
    match check() {
        Ok(_) => CheckStatus::ok(start.elapsed().as_millis() as u64),
        Err(e) => CheckStatus::error(e.to_string()),
    }
}

/// Readiness check endpoint (readiness probe).
/// Checks the scratch root accepts writes and the external tools are installed.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let scratch_check = {
        let start = Instant::now();
        match state.scratch().check_writable().await {
            Ok(()) => CheckStatus::ok(start.elapsed().as_millis() as u64),
            Err(e) => CheckStatus::error(format!(
                "{}: {}",
                state.scratch().root().display(),
                e
            )),
        }
    };

    let checks = ReadinessChecks {
        scratch: scratch_check,
        ytdlp: tool_check(check_ytdlp),
        ffmpeg: tool_check(check_ffmpeg),
        ffprobe: tool_check(check_ffprobe),
    };
    let all_ok = checks.all_ok();

    let response = ReadinessResponse {
        status: if all_ok { "ready" } else { "degraded" }.to_string(),
        checks,
        moment_source: if state.pipeline.has_language_model() {
            "language_model"
        } else {
            "fallback"
        }
        .to_string(),
    };

    if all_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
