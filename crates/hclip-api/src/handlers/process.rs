//! Submit handler: one request runs the whole pipeline.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};
use tracing::{info, warn};

use hclip_models::{ResultManifest, SourceRequest};

use crate::error::{ApiError, ApiResult};
use crate::middleware::RequestId;
use crate::state::AppState;

/// Process a source video and return the clip manifest.
///
/// A body that is not a JSON object, or lacks a usable `url`, is a 400.
pub async fn process_video(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    payload: Result<Json<SourceRequest>, JsonRejection>,
) -> ApiResult<Json<ResultManifest>> {
    let request_id = request_id.map(|Extension(id)| id.0).unwrap_or_default();

    let Json(request) = payload.map_err(|rejection| {
        warn!(request_id = %request_id, "Rejected submit body: {}", rejection.body_text());
        ApiError::bad_request("Missing 'url' in request body")
    })?;

    let output = state.pipeline.process(&request).await?;

    info!(
        request_id = %request_id,
        pipeline_request_id = %output.request_id,
        clips = output.clips.len(),
        skipped = output.skipped.len(),
        fallback = output.fallback.as_ref().map(|f| f.kind()).unwrap_or("none"),
        "Video processed"
    );

    Ok(Json(output.manifest))
}
