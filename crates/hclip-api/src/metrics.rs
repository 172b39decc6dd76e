//! Prometheus metrics for the API server.

use std::sync::LazyLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex_lite::Regex;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "hclip_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "hclip_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "hclip_http_requests_in_flight";

    // Artifact metrics
    pub const ARTIFACTS_EVICTED_TOTAL: &str = "hclip_artifacts_evicted_total";
    pub const ARTIFACT_BYTES_SERVED_TOTAL: &str = "hclip_artifact_bytes_served_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "hclip_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record request namespaces removed by the sweeper.
pub fn record_artifacts_evicted(count: usize) {
    counter!(names::ARTIFACTS_EVICTED_TOTAL).increment(count as u64);
}

/// Record clip bytes sent to a client.
pub fn record_artifact_bytes_served(bytes: u64) {
    counter!(names::ARTIFACT_BYTES_SERVED_TOTAL).increment(bytes);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

static CLIP_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/clips/[^/]+/[^/]+$").expect("valid clip path regex"));

/// Sanitize path for metrics labels (remove IDs, etc.).
fn sanitize_path(path: &str) -> String {
    if CLIP_PATH.is_match(path) {
        return "/clips/:request_id/:filename".to_string();
    }
    path.to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/clips/550e8400-e29b-41d4-a716-446655440000/abc_clip_1.mp4"),
            "/clips/:request_id/:filename"
        );
        assert_eq!(sanitize_path("/process-video"), "/process-video");
        assert_eq!(sanitize_path("/clips/only-one-segment"), "/clips/only-one-segment");
    }
}
