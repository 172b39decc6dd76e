//! Source acquisition using yt-dlp.
//!
//! Downloads a bounded-resolution mp4 plus best-effort VTT captions into a
//! working directory and reports the tool's metadata (id, title, duration).

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info, warn};

use hclip_models::CaptionTrack;

use crate::command::check_ytdlp;
use crate::error::{MediaError, MediaResult};

/// Minimum size for a valid cookies file (bytes).
/// A real Netscape cookies file is at least ~50 bytes.
const MIN_COOKIES_FILE_SIZE: u64 = 50;

/// Options for a yt-dlp acquisition call.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Caption languages in priority order
    pub languages: Vec<String>,
    /// Also accept automatically generated captions
    pub auto_captions: bool,
    /// Maximum video height in pixels
    pub max_height: u32,
    /// Wall-clock limit for the whole call
    pub timeout_secs: u64,
    /// Optional Netscape cookies file passed to yt-dlp
    pub cookies_file: Option<PathBuf>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            languages: vec!["id".to_string(), "en".to_string()],
            auto_captions: false,
            max_height: 480,
            timeout_secs: 900,
            cookies_file: None,
        }
    }
}

impl DownloadOptions {
    /// yt-dlp format selector bounded by `max_height`.
    pub fn format_selector(&self) -> String {
        let h = self.max_height;
        format!(
            "bestvideo[height<={h}][ext=mp4]+bestaudio[ext=m4a]/best[height<={h}][ext=mp4]/best"
        )
    }

    /// Build the yt-dlp argument list for `url`, writing into `workdir`.
    pub fn build_args(&self, url: &str, workdir: &Path, cookies: Option<&Path>) -> Vec<String> {
        let template = workdir.join("%(id)s.%(ext)s");

        let mut args = vec![
            "--no-playlist".to_string(),
            "--no-progress".to_string(),
            "--no-warnings".to_string(),
            "-f".to_string(),
            self.format_selector(),
            "--merge-output-format".to_string(),
            "mp4".to_string(),
            "--write-subs".to_string(),
        ];

        if self.auto_captions {
            args.push("--write-auto-subs".to_string());
        }

        args.extend([
            "--sub-langs".to_string(),
            self.languages.join(","),
            "--sub-format".to_string(),
            "vtt".to_string(),
            // Print the info JSON after the download instead of simulating
            "--dump-single-json".to_string(),
            "--no-simulate".to_string(),
            "-o".to_string(),
            template.to_string_lossy().to_string(),
        ]);

        if let Some(cp) = cookies {
            args.push("--cookies".to_string());
            args.push(cp.to_string_lossy().to_string());
        }

        args.push(url.to_string());
        args
    }
}

/// Result of a successful acquisition call.
#[derive(Debug, Clone)]
pub struct DownloadedSource {
    /// Raw identifier reported by yt-dlp
    pub id: String,
    /// Original title
    pub title: String,
    /// Duration as reported by the extractor, if any
    pub reported_duration: Option<f64>,
    /// Local video file
    pub video_path: PathBuf,
    /// Caption files that materialized, in language priority order
    pub captions: Vec<CaptionTrack>,
}

/// Subset of yt-dlp's info JSON we rely on.
#[derive(Debug, Deserialize)]
struct InfoJson {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    requested_downloads: Vec<RequestedDownload>,
}

#[derive(Debug, Deserialize)]
struct RequestedDownload {
    #[serde(default)]
    filepath: Option<PathBuf>,
}

/// Download a video and its captions with yt-dlp.
///
/// # Errors
///
/// - [`MediaError::YtDlpNotFound`] if the tool is missing
/// - [`MediaError::Timeout`] if the call exceeds `timeout_secs`
/// - [`MediaError::DownloadFailed`] if the tool fails or no video file exists afterwards
pub async fn download_with_captions(
    url: &str,
    workdir: impl AsRef<Path>,
    options: &DownloadOptions,
) -> MediaResult<DownloadedSource> {
    let workdir = workdir.as_ref();
    check_ytdlp()?;
    tokio::fs::create_dir_all(workdir).await?;

    let cookies = match options.cookies_file.as_deref() {
        Some(path) => usable_cookies(path).await,
        None => None,
    };
    let args = options.build_args(url, workdir, cookies);

    info!(
        url = %url,
        workdir = %workdir.display(),
        languages = %options.languages.join(","),
        "Downloading source video with yt-dlp"
    );
    debug!("Running yt-dlp {}", args.join(" "));

    let call = Command::new("yt-dlp")
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(Duration::from_secs(options.timeout_secs), call).await
    {
        Ok(result) => result?,
        Err(_) => {
            warn!(url = %url, timeout_secs = options.timeout_secs, "yt-dlp timed out");
            return Err(MediaError::Timeout(options.timeout_secs));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!("yt-dlp stderr: {}", stderr);

        let error_msg = stderr
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .unwrap_or("Unknown error");

        if stderr.contains("429") || stderr.contains("Too Many Requests") {
            warn!(url = %url, "Source platform rate limit detected");
        }

        return Err(MediaError::download_failed(format!(
            "yt-dlp failed: {}",
            error_msg
        )));
    }

    let info = parse_info_json(&output.stdout)?;
    let video_path = locate_video(workdir, &info)
        .ok_or_else(|| MediaError::download_failed("Output video file not created"))?;
    let captions = locate_captions(workdir, &info.id, &options.languages);

    let file_size = video_path.metadata()?.len();
    info!(
        id = %info.id,
        output = %video_path.display(),
        size_mb = file_size as f64 / (1024.0 * 1024.0),
        captions = captions.len(),
        "Downloaded source video"
    );

    Ok(DownloadedSource {
        title: info.title.clone().unwrap_or_else(|| info.id.clone()),
        id: info.id,
        reported_duration: info.duration.filter(|d| d.is_finite() && *d > 0.0),
        video_path,
        captions,
    })
}

/// Parse the info JSON yt-dlp prints on stdout.
///
/// Only the last JSON-looking line is considered, so stray log lines are tolerated.
fn parse_info_json(stdout: &[u8]) -> MediaResult<InfoJson> {
    let text = String::from_utf8_lossy(stdout);
    let line = text
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| l.starts_with('{'))
        .ok_or_else(|| MediaError::download_failed("yt-dlp printed no metadata"))?;

    Ok(serde_json::from_str(line)?)
}

/// Find the downloaded video: `<workdir>/<id>.mp4`, else what yt-dlp reported.
fn locate_video(workdir: &Path, info: &InfoJson) -> Option<PathBuf> {
    let expected = workdir.join(format!("{}.mp4", info.id));
    if expected.is_file() {
        return Some(expected);
    }

    info.requested_downloads
        .iter()
        .filter_map(|d| d.filepath.clone())
        .find(|p| p.is_file())
}

/// Collect `<workdir>/<id>.<lang>.vtt` for each language that materialized.
fn locate_captions(workdir: &Path, id: &str, languages: &[String]) -> Vec<CaptionTrack> {
    languages
        .iter()
        .filter_map(|lang| {
            let path = workdir.join(format!("{}.{}.vtt", id, lang));
            path.is_file().then(|| CaptionTrack::new(lang.clone(), path))
        })
        .collect()
}

/// Validate that a cookies file appears to be in Netscape format.
fn is_valid_netscape_cookies(content: &str) -> bool {
    if content.starts_with("# Netscape HTTP Cookie File")
        || content.starts_with("# HTTP Cookie File")
    {
        return true;
    }

    // Tab-separated cookie entries (domain\ttrue/false\t...)
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .any(|l| l.split('\t').count() >= 6)
}

/// Return the cookies path if it exists and looks usable.
async fn usable_cookies(path: &Path) -> Option<&Path> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) if content.len() as u64 >= MIN_COOKIES_FILE_SIZE => {
            if is_valid_netscape_cookies(&content) {
                Some(path)
            } else {
                warn!(path = %path.display(), "Cookies file is not in Netscape format, ignoring");
                None
            }
        }
        Ok(_) => {
            debug!(path = %path.display(), "Cookies file too small, ignoring");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), "Failed to read cookies file: {}", e);
            None
        }
    }
}
