//! Acquisition stage: source URL to local media.

use std::path::Path;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{info, warn};

use hclip_media::{download_with_captions, probe_video, DownloadOptions};
use hclip_models::{AcquiredMedia, MediaId};

use crate::error::{PipelineError, PipelineResult};
use crate::metrics;

/// Fetches a source video and its captions into a working directory.
///
/// Failures of the fetch itself are [`PipelineError::Acquisition`]; a fetched
/// file that cannot be read is [`PipelineError::Fatal`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaAcquirer: Send + Sync {
    async fn acquire(&self, url: &str, workdir: &Path) -> PipelineResult<AcquiredMedia>;
}

/// yt-dlp download followed by an ffprobe duration probe.
#[derive(Debug, Clone)]
pub struct YtDlpAcquirer {
    options: DownloadOptions,
}

impl YtDlpAcquirer {
    pub fn new(options: DownloadOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl MediaAcquirer for YtDlpAcquirer {
    async fn acquire(&self, url: &str, workdir: &Path) -> PipelineResult<AcquiredMedia> {
        let started = Instant::now();

        let source = download_with_captions(url, workdir, &self.options)
            .await
            .map_err(|e| PipelineError::acquisition(e.to_string()))?;

        metrics::record_acquisition_duration(started.elapsed().as_secs_f64());

        let probed = probe_video(&source.video_path)
            .await
            .map_err(|e| PipelineError::fatal(format!("Source media is unreadable: {}", e)))?;

        let duration_secs = match (probed.duration, source.reported_duration) {
            (Some(d), _) => d,
            (None, Some(reported)) => {
                warn!(
                    id = %source.id,
                    reported,
                    "ffprobe reported no duration, using extractor duration"
                );
                reported
            }
            (None, None) => {
                return Err(PipelineError::fatal(
                    "Source media duration could not be determined",
                ))
            }
        };

        info!(
            id = %source.id,
            title = %source.title,
            duration_secs,
            captions = source.captions.len(),
            "Acquired source media"
        );

        Ok(AcquiredMedia {
            media_id: MediaId::new(&source.id),
            title: source.title,
            video_path: source.video_path,
            duration_secs,
            captions: source.captions,
        })
    }
}
