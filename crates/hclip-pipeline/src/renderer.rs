//! Clip renderer: bounds validation, encoding and scoring per candidate.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use hclip_media::{extract_clip, MediaError, MediaResult};
use hclip_models::{AcquiredMedia, BoundsViolation, EncodingConfig, Moment, RenderedClip, ValidatedMoment};

use crate::error::{PipelineError, PipelineResult};
use crate::metrics;
use crate::scoring::ClipScorer;
use crate::scratch::RequestScratch;

/// Encodes one validated sub-range of a source file.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClipEncoder: Send + Sync {
    async fn encode(&self, source: &Path, moment: &ValidatedMoment, output: &Path) -> MediaResult<()>;
}

/// FFmpeg-backed encoder.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    encoding: EncodingConfig,
    timeout: Duration,
}

impl FfmpegEncoder {
    pub fn new(encoding: EncodingConfig, timeout: Duration) -> Self {
        Self { encoding, timeout }
    }
}

#[async_trait]
impl ClipEncoder for FfmpegEncoder {
    async fn encode(&self, source: &Path, moment: &ValidatedMoment, output: &Path) -> MediaResult<()> {
        extract_clip(
            source,
            output,
            f64::from(moment.start()),
            f64::from(moment.end()),
            &self.encoding,
            self.timeout.as_secs(),
        )
        .await
    }
}

/// A candidate that produced no clip.
#[derive(Debug)]
pub enum RenderSkip {
    OutOfBounds {
        index: usize,
        violation: BoundsViolation,
    },
    EncodeFailed {
        index: usize,
        error: String,
    },
}

impl RenderSkip {
    pub fn kind(&self) -> &'static str {
        match self {
            RenderSkip::OutOfBounds { .. } => "out_of_bounds",
            RenderSkip::EncodeFailed { .. } => "encode_failed",
        }
    }

    /// 1-based position of the skipped candidate.
    pub fn index(&self) -> usize {
        match self {
            RenderSkip::OutOfBounds { index, .. } | RenderSkip::EncodeFailed { index, .. } => *index,
        }
    }
}

/// Rendered clips in candidate order, plus what was skipped.
#[derive(Debug, Default)]
pub struct RenderOutcome {
    pub clips: Vec<RenderedClip>,
    pub skipped: Vec<RenderSkip>,
}

/// Turns candidate moments into encoded clips.
pub struct ClipRenderer {
    encoder: Arc<dyn ClipEncoder>,
    scorer: Arc<dyn ClipScorer>,
}

impl ClipRenderer {
    pub fn new(encoder: Arc<dyn ClipEncoder>, scorer: Arc<dyn ClipScorer>) -> Self {
        Self { encoder, scorer }
    }

    /// Render every candidate in order.
    ///
    /// Candidate `i` (1-based) is written to `<media_id>_clip_<i>.mp4` in the
    /// request namespace. Out-of-bounds candidates and failed encodes are
    /// skipped; an unreadable source aborts with [`PipelineError::Fatal`].
    pub async fn render(
        &self,
        media: &AcquiredMedia,
        candidates: &[Moment],
        scratch: &RequestScratch,
    ) -> PipelineResult<RenderOutcome> {
        let mut outcome = RenderOutcome::default();

        for (position, candidate) in candidates.iter().enumerate() {
            let index = position + 1;

            let moment = match candidate.validate_within(media.duration_secs) {
                Ok(moment) => moment,
                Err(violation) => {
                    info!(
                        index,
                        start = candidate.start,
                        end = candidate.end,
                        duration_secs = media.duration_secs,
                        "Skipping candidate: {}",
                        violation
                    );
                    self.skip(&mut outcome, RenderSkip::OutOfBounds { index, violation });
                    continue;
                }
            };

            let file_name = media.media_id.clip_file_name(index);
            let output = scratch.artifact_path(&file_name);
            let started = Instant::now();

            match self.encoder.encode(&media.video_path, &moment, &output).await {
                Ok(()) if output.is_file() => {
                    metrics::record_clip_rendered(started.elapsed().as_secs_f64());
                    let clip = RenderedClip {
                        filename: scratch.artifact_name(&file_name),
                        path: output,
                        title: moment.title().to_string(),
                        score: self.scorer.score(),
                        moment,
                    };
                    debug!(index, filename = %clip.filename, score = clip.score, "Rendered clip");
                    outcome.clips.push(clip);
                }
                Ok(()) => {
                    let error = "encoder reported success but wrote no file".to_string();
                    warn!(index, "Skipping candidate: {}", error);
                    self.skip(&mut outcome, RenderSkip::EncodeFailed { index, error });
                }
                Err(e) if e.is_source_unreadable() => {
                    remove_partial(&output).await;
                    return Err(PipelineError::fatal(format!("Source media is unreadable: {}", e)));
                }
                Err(e) => {
                    remove_partial(&output).await;
                    warn!(index, error = %e, "Clip encode failed, skipping");
                    self.skip(&mut outcome, RenderSkip::EncodeFailed { index, error: describe(&e) });
                }
            }
        }

        Ok(outcome)
    }

    fn skip(&self, outcome: &mut RenderOutcome, skip: RenderSkip) {
        metrics::record_clip_skipped(skip.kind());
        outcome.skipped.push(skip);
    }
}

fn describe(err: &MediaError) -> String {
    match err {
        MediaError::FfmpegFailed {
            message,
            stderr: Some(stderr),
            ..
        } => format!("{}: {}", message, stderr.lines().last().unwrap_or_default()),
        other => other.to_string(),
    }
}

async fn remove_partial(output: &Path) {
    if output.exists() {
        if let Err(e) = tokio::fs::remove_file(output).await {
            warn!(output = %output.display(), "Failed to remove partial clip: {}", e);
        }
    }
}
