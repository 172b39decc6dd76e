//! Sub-range clip extraction.

use std::path::Path;

use tracing::{debug, info};

use hclip_models::EncodingConfig;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Encode `[start_secs, end_secs)` of `input` into `output`.
///
/// Uses input-side seeking so the source is not decoded from the beginning.
/// A partially written output file is removed when encoding fails.
pub async fn extract_clip(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    start_secs: f64,
    end_secs: f64,
    encoding: &EncodingConfig,
    timeout_secs: u64,
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }

    let duration = end_secs - start_secs;
    if duration.is_nan() || duration <= 0.0 {
        return Err(MediaError::internal(format!(
            "Empty clip range: {:.3}-{:.3}",
            start_secs, end_secs
        )));
    }

    info!(
        input = %input.display(),
        output = %output.display(),
        start = start_secs,
        end = end_secs,
        "Extracting clip"
    );

    let cmd = FfmpegCommand::new(input, output)
        .seek(start_secs)
        .duration(duration)
        .encoding(encoding);

    let total_ms = (duration * 1000.0) as i64;
    let runner = FfmpegRunner::new().with_timeout(timeout_secs);
    let result = runner
        .run_with_progress(&cmd, move |progress| {
            debug!(
                percent = progress.percentage(total_ms),
                speed = progress.speed,
                "Clip encode progress"
            );
        })
        .await;

    match result {
        Ok(()) if output.is_file() => {
            info!(output = %output.display(), "Clip extracted");
            Ok(())
        }
        Ok(()) => Err(MediaError::ffmpeg_failed(
            "FFmpeg reported success but wrote no output",
            None,
            None,
        )),
        Err(e) => {
            remove_partial(output).await;
            Err(classify_failure(e))
        }
    }
}

/// FFmpeg errors that mean the input itself is unreadable become `InvalidVideo`.
fn classify_failure(err: MediaError) -> MediaError {
    match err {
        MediaError::FfmpegFailed {
            stderr: Some(ref stderr),
            ..
        } if is_unreadable_input(stderr) => MediaError::invalid_video(
            stderr
                .lines()
                .last()
                .unwrap_or("source file is unreadable")
                .to_string(),
        ),
        other => other,
    }
}

fn is_unreadable_input(stderr: &str) -> bool {
    stderr.contains("Invalid data found when processing input")
        || stderr.contains("moov atom not found")
        || stderr.contains("No such file or directory")
}

async fn remove_partial(output: &Path) {
    if output.exists() {
        if let Err(e) = tokio::fs::remove_file(output).await {
            debug!(output = %output.display(), "Failed to remove partial clip: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_input_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract_clip(
            dir.path().join("missing.mp4"),
            dir.path().join("out.mp4"),
            0.0,
            10.0,
            &EncodingConfig::default(),
            5,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn test_empty_range_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.mp4");
        std::fs::write(&input, b"x").unwrap();

        let err = extract_clip(&input, dir.path().join("out.mp4"), 10.0, 10.0, &EncodingConfig::default(), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Internal(_)));
    }

    #[test]
    fn test_classify_unreadable_input() {
        let err = MediaError::ffmpeg_failed(
            "FFmpeg exited with non-zero status",
            Some("/tmp/in.mp4: Invalid data found when processing input".to_string()),
            Some(1),
        );
        assert!(classify_failure(err).is_source_unreadable());

        let err = MediaError::ffmpeg_failed("exit", Some("Conversion failed!".to_string()), Some(1));
        assert!(!classify_failure(err).is_source_unreadable());
    }
}
