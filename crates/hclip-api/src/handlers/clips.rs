//! Clip retrieval.

use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::{header, HeaderValue};
use axum::response::Response;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Serve a rendered clip by request id and file name.
///
/// Range requests, conditional headers and the content type come from
/// `ServeFile`. Lookup failures are answered here so they keep the JSON
/// error shape.
pub async fn serve_clip(
    State(state): State<AppState>,
    Path((request_id, filename)): Path<(String, String)>,
    request: Request,
) -> ApiResult<Response> {
    let path = state.scratch().resolve_artifact(&request_id, &filename)?;

    match tokio::fs::metadata(&path).await {
        Ok(metadata) if metadata.is_file() => {}
        Ok(_) => return Err(ApiError::not_found("Clip not found")),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::not_found("Clip not found"));
        }
        Err(e) => return Err(ApiError::internal(format!("Failed to stat clip: {}", e))),
    }

    let mut response = match ServeFile::new(&path).oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    };

    response.headers_mut().insert(
        header::HeaderName::from_static("cross-origin-resource-policy"),
        HeaderValue::from_static("cross-origin"),
    );

    let bytes = response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);

    debug!(
        request_id = %request_id,
        filename = %filename,
        status = response.status().as_u16(),
        bytes,
        "Serving clip"
    );
    if response.status().is_success() {
        metrics::record_artifact_bytes_served(bytes);
    }

    Ok(response)
}
