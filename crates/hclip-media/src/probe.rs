//! FFprobe video information.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};

/// Video file information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Duration in seconds, when the container reports one
    pub duration: Option<f64>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Video codec
    pub codec: String,
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

/// Probe a video file for information.
///
/// Returns [`MediaError::FileNotFound`] when the path does not exist and
/// [`MediaError::InvalidVideo`] when ffprobe cannot read it or it has no video stream.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    check_ffprobe()?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MediaError::invalid_video(format!(
            "ffprobe could not read {}: {}",
            path.display(),
            stderr.lines().last().unwrap_or("unknown error")
        )));
    }

    parse_probe_output(&output.stdout)
}

fn parse_probe_output(stdout: &[u8]) -> MediaResult<VideoInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)?;

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::invalid_video("No video stream found"))?;

    // Container duration first, stream duration as a fallback
    let duration = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or(video_stream.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0);

    Ok(VideoInfo {
        duration,
        width: video_stream.width.unwrap_or(0),
        height: video_stream.height.unwrap_or(0),
        codec: video_stream.codec_name.clone().unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_output() {
        let json = br#"{
            "streams": [
                {"codec_type": "audio", "codec_name": "aac"},
                {"codec_type": "video", "codec_name": "h264", "width": 854, "height": 480}
            ],
            "format": {"duration": "212.345000"}
        }"#;

        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.codec, "h264");
        assert_eq!(info.height, 480);
        assert!((info.duration.unwrap() - 212.345).abs() < 1e-6);
    }

    #[test]
    fn test_stream_duration_fallback() {
        let json = br#"{
            "streams": [{"codec_type": "video", "duration": "90.0"}],
            "format": {}
        }"#;
        assert_eq!(parse_probe_output(json).unwrap().duration, Some(90.0));
    }

    #[test]
    fn test_no_video_stream_is_invalid() {
        let json = br#"{"streams": [{"codec_type": "audio"}], "format": {"duration": "10"}}"#;
        let err = parse_probe_output(json).unwrap_err();
        assert!(err.is_source_unreadable());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = probe_video("/nonexistent/definitely/missing.mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
