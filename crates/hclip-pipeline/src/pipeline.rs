//! End-to-end request pipeline.
//!
//! acquisition -> transcript -> moment selection -> render -> catalog,
//! strictly in that order, inside one per-request scratch namespace.

use std::sync::Arc;
use std::time::Instant;

use url::Url;
use uuid::Uuid;
use validator::Validate;

use hclip_models::{RenderedClip, ResultManifest, SourceRequest};

use crate::acquire::{MediaAcquirer, YtDlpAcquirer};
use crate::catalog::build_manifest;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::llm::{create_language_model, LanguageModel};
use crate::logging::RequestLogger;
use crate::metrics;
use crate::moments::{FallbackReason, MomentSelector, SelectionPolicy};
use crate::renderer::{ClipEncoder, ClipRenderer, FfmpegEncoder, RenderSkip};
use crate::scoring::{ClipScorer, RandomDisplayScore};
use crate::scratch::{RequestScratch, ScratchSpace};
use crate::transcript::load_transcript;

/// Everything a finished request produced.
#[derive(Debug)]
pub struct PipelineOutput {
    pub request_id: Uuid,
    pub manifest: ResultManifest,
    pub clips: Vec<RenderedClip>,
    pub skipped: Vec<RenderSkip>,
    pub fallback: Option<FallbackReason>,
}

/// The highlight pipeline with its collaborators.
pub struct HighlightPipeline {
    caption_languages: Vec<String>,
    scratch: ScratchSpace,
    acquirer: Arc<dyn MediaAcquirer>,
    selector: MomentSelector,
    renderer: ClipRenderer,
}

impl HighlightPipeline {
    /// Build the pipeline with the default collaborators (yt-dlp, Gemini, FFmpeg).
    pub fn from_config(config: PipelineConfig) -> Self {
        let acquirer = Arc::new(YtDlpAcquirer::new(config.download_options()));
        let model = create_language_model(&config);
        let encoder = Arc::new(FfmpegEncoder::new(
            config.encoding.clone(),
            config.encode_timeout,
        ));

        Self::new(config, acquirer, model, encoder, Arc::new(RandomDisplayScore))
    }

    /// Build the pipeline with explicit collaborators.
    pub fn new(
        config: PipelineConfig,
        acquirer: Arc<dyn MediaAcquirer>,
        model: Option<Arc<dyn LanguageModel>>,
        encoder: Arc<dyn ClipEncoder>,
        scorer: Arc<dyn ClipScorer>,
    ) -> Self {
        Self {
            selector: MomentSelector::new(model, SelectionPolicy::from(&config)),
            renderer: ClipRenderer::new(encoder, scorer),
            scratch: ScratchSpace::new(config.scratch_dir.clone()),
            caption_languages: config.caption_languages,
            acquirer,
        }
    }

    pub fn scratch(&self) -> &ScratchSpace {
        &self.scratch
    }

    pub fn has_language_model(&self) -> bool {
        self.selector.has_model()
    }

    /// Run one request to completion.
    pub async fn process(&self, request: &SourceRequest) -> PipelineResult<PipelineOutput> {
        let started = Instant::now();

        let url = match validate_request(request) {
            Ok(url) => url,
            Err(e) => {
                metrics::record_pipeline_outcome(e.kind(), started.elapsed().as_secs_f64());
                return Err(e);
            }
        };

        let result = self.run(&url).await;
        let outcome = match &result {
            Ok(_) => "completed",
            Err(e) => e.kind(),
        };
        metrics::record_pipeline_outcome(outcome, started.elapsed().as_secs_f64());

        result
    }

    async fn run(&self, url: &str) -> PipelineResult<PipelineOutput> {
        let mut scratch = self.scratch.create_request().await?;
        let logger = RequestLogger::new(scratch.request_id(), "process_video");
        logger.log_start(url);

        match self.run_stages(url, &mut scratch, &logger).await {
            Ok(output) => {
                scratch.release_source().await;
                if output.clips.is_empty() {
                    scratch.discard().await;
                }
                logger.log_completion(&format!(
                    "{} clip(s), {} skipped, fallback: {}",
                    output.clips.len(),
                    output.skipped.len(),
                    output
                        .fallback
                        .as_ref()
                        .map(FallbackReason::kind)
                        .unwrap_or("none")
                ));
                Ok(output)
            }
            Err(e) => {
                logger.log_error(&e.to_string());
                scratch.discard().await;
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        url: &str,
        scratch: &mut RequestScratch,
        logger: &RequestLogger,
    ) -> PipelineResult<PipelineOutput> {
        let media = self.acquirer.acquire(url, scratch.source_dir()).await?;
        logger.log_progress(&format!(
            "acquired '{}' ({:.1}s, {} caption track(s))",
            media.title,
            media.duration_secs,
            media.captions.len()
        ));

        let transcript = load_transcript(&media, &self.caption_languages).await;
        if !transcript.is_available() {
            logger.log_warning("transcript unavailable");
        }

        let selection = self.selector.select(&transcript).await;
        logger.log_progress(&format!("{} candidate moment(s)", selection.moments.len()));

        let outcome = self
            .renderer
            .render(&media, &selection.moments, scratch)
            .await?;

        if outcome.clips.is_empty() {
            logger.log_warning("no candidate produced a clip");
        }

        Ok(PipelineOutput {
            request_id: scratch.request_id(),
            manifest: build_manifest(&media.title, &outcome.clips),
            clips: outcome.clips,
            skipped: outcome.skipped,
            fallback: selection.fallback,
        })
    }
}

/// Check the request and return the trimmed source URL.
pub fn validate_request(request: &SourceRequest) -> PipelineResult<String> {
    let url = request
        .trimmed_url()
        .ok_or_else(|| PipelineError::invalid_request("Missing 'url' in request body"))?;

    request
        .validate()
        .map_err(|_| PipelineError::invalid_request("Invalid 'url': not a valid URL"))?;

    let parsed = Url::parse(url)
        .map_err(|e| PipelineError::invalid_request(format!("Invalid 'url': {}", e)))?;

    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(PipelineError::invalid_request(
            "Invalid 'url': only http and https URLs are supported",
        ));
    }

    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquire::MockMediaAcquirer;
    use crate::llm::{LlmError, MockLanguageModel};
    use crate::moments::fallback_moments;
    use crate::renderer::MockClipEncoder;
    use crate::scoring::{FixedScore, DISPLAY_SCORE_RANGE};
    use hclip_models::{AcquiredMedia, CaptionTrack, MediaId};
    use std::path::Path;

    const VTT: &str = "WEBVTT\n\n00:00:01.000 --> 00:00:04.000\nhello everyone\n";

    fn config(root: &Path) -> PipelineConfig {
        PipelineConfig {
            scratch_dir: root.to_path_buf(),
            ..Default::default()
        }
    }

    fn acquirer(duration_secs: f64, with_captions: bool) -> MockMediaAcquirer {
        let mut acquirer = MockMediaAcquirer::new();
        acquirer.expect_acquire().times(1).returning(move |_, workdir| {
            let video_path = workdir.join("abc.mp4");
            std::fs::write(&video_path, b"video").unwrap();

            let mut captions = Vec::new();
            if with_captions {
                let path = workdir.join("abc.en.vtt");
                std::fs::write(&path, VTT).unwrap();
                captions.push(CaptionTrack::new("en", path));
            }

            Ok(AcquiredMedia {
                media_id: MediaId::new("abc"),
                title: "Original Title".to_string(),
                video_path,
                duration_secs,
                captions,
            })
        });
        acquirer
    }

    fn encoder() -> MockClipEncoder {
        let mut encoder = MockClipEncoder::new();
        encoder.expect_encode().returning(|source, moment, output| {
            assert!(source.is_file());
            assert!(moment.start() < moment.end());
            std::fs::write(output, b"clip").unwrap();
            Ok(())
        });
        encoder
    }

    fn model_returning(text: &'static str) -> Arc<dyn LanguageModel> {
        let mut model = MockLanguageModel::new();
        model
            .expect_generate()
            .times(1)
            .returning(move |_| Ok(text.to_string()));
        Arc::new(model)
    }

    #[tokio::test]
    async fn test_out_of_bounds_candidate_dropped() {
        let root = tempfile::tempdir().unwrap();
        let pipeline = HighlightPipeline::new(
            config(root.path()),
            Arc::new(acquirer(100.0, true)),
            Some(model_returning(
                r#"[{"start_time":10,"end_time":30,"title":"X"},{"start_time":90,"end_time":120,"title":"Y"}]"#,
            )),
            Arc::new(encoder()),
            Arc::new(FixedScore(88)),
        );

        let output = pipeline
            .process(&SourceRequest::new("https://www.youtube.com/watch?v=abc"))
            .await
            .unwrap();

        assert_eq!(output.manifest.original_title, "Original Title");
        assert_eq!(output.manifest.clips.len(), 1);
        assert_eq!(output.manifest.clips[0].title, "X");
        assert_eq!(output.manifest.clips[0].viral_score, 88);
        assert_eq!(
            output.manifest.clips[0].filename,
            format!("{}/abc_clip_1.mp4", output.request_id)
        );
        assert!(output.fallback.is_none());

        // Clips listed in the manifest exist; the source media is gone
        let request_dir = root.path().join(output.request_id.to_string());
        assert!(request_dir.join("abc_clip_1.mp4").is_file());
        let leftovers: Vec<_> = std::fs::read_dir(&request_dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".source-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_fenced_model_output() {
        let root = tempfile::tempdir().unwrap();
        let pipeline = HighlightPipeline::new(
            config(root.path()),
            Arc::new(acquirer(60.0, true)),
            Some(model_returning(
                "```json\n[{\"start_time\":5,\"end_time\":20,\"title\":\"Hook\"}]\n```",
            )),
            Arc::new(encoder()),
            Arc::new(FixedScore(75)),
        );

        let output = pipeline
            .process(&SourceRequest::new("https://youtu.be/abc"))
            .await
            .unwrap();

        assert_eq!(output.clips.len(), 1);
        assert_eq!(output.clips[0].moment.start(), 5);
        assert_eq!(output.clips[0].moment.end(), 20);
        assert_eq!(output.clips[0].title, "Hook");
    }

    #[tokio::test]
    async fn test_model_failure_uses_fallback() {
        let root = tempfile::tempdir().unwrap();
        let mut model = MockLanguageModel::new();
        model
            .expect_generate()
            .times(1)
            .returning(|_| Err(LlmError::Api { status: 500, body: "boom".to_string() }));

        let pipeline = HighlightPipeline::new(
            config(root.path()),
            Arc::new(acquirer(90.0, true)),
            Some(Arc::new(model)),
            Arc::new(encoder()),
            Arc::new(RandomDisplayScore),
        );

        let output = pipeline
            .process(&SourceRequest::new("https://youtu.be/abc"))
            .await
            .unwrap();

        assert!(output.fallback.is_some());
        assert_eq!(output.clips.len(), 2);
        let titles: Vec<_> = output.manifest.clips.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Highlight 1 (auto)", "Highlight 2 (auto)"]);
        for clip in &output.manifest.clips {
            assert!(DISPLAY_SCORE_RANGE.contains(&clip.viral_score));
        }
    }

    #[tokio::test]
    async fn test_no_captions_skips_model() {
        let root = tempfile::tempdir().unwrap();
        let mut model = MockLanguageModel::new();
        model.expect_generate().never();

        let pipeline = HighlightPipeline::new(
            config(root.path()),
            Arc::new(acquirer(90.0, false)),
            Some(Arc::new(model)),
            Arc::new(encoder()),
            Arc::new(FixedScore(70)),
        );

        let output = pipeline
            .process(&SourceRequest::new("https://youtu.be/abc"))
            .await
            .unwrap();

        assert!(matches!(
            output.fallback,
            Some(FallbackReason::TranscriptUnavailable)
        ));
        let moments: Vec<_> = output.clips.iter().map(|c| c.moment.as_moment().clone()).collect();
        assert_eq!(moments, fallback_moments());
    }

    #[tokio::test]
    async fn test_missing_url_is_invalid_request() {
        let root = tempfile::tempdir().unwrap();
        let mut acquirer = MockMediaAcquirer::new();
        acquirer.expect_acquire().never();

        let pipeline = HighlightPipeline::new(
            config(root.path()),
            Arc::new(acquirer),
            None,
            Arc::new(MockClipEncoder::new()),
            Arc::new(FixedScore(70)),
        );

        for request in [
            SourceRequest::default(),
            SourceRequest::new(""),
            SourceRequest::new("   "),
            SourceRequest::new("not a url"),
            SourceRequest::new("ftp://example.com/video.mp4"),
        ] {
            let err = pipeline.process(&request).await.unwrap_err();
            assert!(err.is_client_error(), "expected invalid request for {:?}", request);
        }

        // No scratch namespace was created
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_all_candidates_out_of_bounds_is_empty_manifest() {
        let root = tempfile::tempdir().unwrap();
        let pipeline = HighlightPipeline::new(
            config(root.path()),
            Arc::new(acquirer(8.0, false)),
            None,
            Arc::new(MockClipEncoder::new()),
            Arc::new(FixedScore(70)),
        );

        let output = pipeline
            .process(&SourceRequest::new("https://youtu.be/abc"))
            .await
            .unwrap();

        assert!(output.manifest.clips.is_empty());
        assert_eq!(output.skipped.len(), 2);
        assert!(!root.path().join(output.request_id.to_string()).exists());
    }

    #[tokio::test]
    async fn test_acquisition_failure_cleans_scratch() {
        let root = tempfile::tempdir().unwrap();
        let mut acquirer = MockMediaAcquirer::new();
        acquirer
            .expect_acquire()
            .times(1)
            .returning(|_, _| Err(PipelineError::acquisition("yt-dlp failed: Video unavailable")));

        let pipeline = HighlightPipeline::new(
            config(root.path()),
            Arc::new(acquirer),
            None,
            Arc::new(MockClipEncoder::new()),
            Arc::new(FixedScore(70)),
        );

        let err = pipeline
            .process(&SourceRequest::new("https://youtu.be/abc"))
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Acquisition(_)));
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_requests_do_not_share_paths() {
        let root = tempfile::tempdir().unwrap();
        let mut acquirer = MockMediaAcquirer::new();
        acquirer.expect_acquire().times(2).returning(|_, workdir| {
            let video_path = workdir.join("abc.mp4");
            std::fs::write(&video_path, b"video").unwrap();
            Ok(AcquiredMedia {
                media_id: MediaId::new("abc"),
                title: "Same".to_string(),
                video_path,
                duration_secs: 90.0,
                captions: Vec::new(),
            })
        });

        let pipeline = HighlightPipeline::new(
            config(root.path()),
            Arc::new(acquirer),
            None,
            Arc::new(encoder()),
            Arc::new(FixedScore(70)),
        );

        let request = SourceRequest::new("https://youtu.be/abc");
        let (a, b) = tokio::join!(pipeline.process(&request), pipeline.process(&request));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a.request_id, b.request_id);
        assert_ne!(a.manifest.clips[0].filename, b.manifest.clips[0].filename);
        assert!(a.clips[0].path.is_file());
        assert!(b.clips[0].path.is_file());
    }

    #[test]
    fn test_validate_request_trims() {
        let url = validate_request(&SourceRequest::new("  https://youtu.be/abc  ")).unwrap();
        assert_eq!(url, "https://youtu.be/abc");
    }
}
