//! Pipeline metrics.
//!
//! Recorded through the `metrics` facade; the HTTP server installs the
//! Prometheus recorder. Without a recorder these calls are no-ops.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const PIPELINE_REQUESTS_TOTAL: &str = "hclip_pipeline_requests_total";
    pub const PIPELINE_DURATION_SECONDS: &str = "hclip_pipeline_duration_seconds";
    pub const ACQUISITION_DURATION_SECONDS: &str = "hclip_acquisition_duration_seconds";
    pub const MOMENT_FALLBACK_TOTAL: &str = "hclip_moment_fallback_total";
    pub const CLIPS_RENDERED_TOTAL: &str = "hclip_clips_rendered_total";
    pub const CLIPS_SKIPPED_TOTAL: &str = "hclip_clips_skipped_total";
    pub const FFMPEG_DURATION_SECONDS: &str = "hclip_ffmpeg_duration_seconds";
}

/// Record a finished request by outcome (`completed`, `invalid_request`, ...).
pub fn record_pipeline_outcome(outcome: &str, duration_secs: f64) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::PIPELINE_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::PIPELINE_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record acquisition duration.
pub fn record_acquisition_duration(duration_secs: f64) {
    histogram!(names::ACQUISITION_DURATION_SECONDS).record(duration_secs);
}

/// Record use of the fallback moment list.
pub fn record_moment_fallback(reason: &str) {
    let labels = [("reason", reason.to_string())];
    counter!(names::MOMENT_FALLBACK_TOTAL, &labels).increment(1);
}

/// Record a rendered clip and its encode time.
pub fn record_clip_rendered(duration_secs: f64) {
    counter!(names::CLIPS_RENDERED_TOTAL).increment(1);
    histogram!(names::FFMPEG_DURATION_SECONDS).record(duration_secs);
}

/// Record a skipped candidate.
pub fn record_clip_skipped(reason: &str) {
    let labels = [("reason", reason.to_string())];
    counter!(names::CLIPS_SKIPPED_TOTAL, &labels).increment(1);
}
