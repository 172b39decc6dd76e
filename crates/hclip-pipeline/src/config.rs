//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use hclip_media::DownloadOptions;
use hclip_models::EncodingConfig;

/// Default Gemini REST endpoint.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
/// Default Gemini model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Pipeline configuration.
#[derive(Clone)]
pub struct PipelineConfig {
    /// Root of the per-request scratch namespaces
    pub scratch_dir: PathBuf,
    /// Caption languages in priority order
    pub caption_languages: Vec<String>,
    /// Accept automatically generated captions
    pub auto_captions: bool,
    /// Maximum source video height
    pub max_video_height: u32,
    /// Optional Netscape cookies file for the acquisition tool
    pub cookies_file: Option<PathBuf>,
    /// Transcript prefix sent to the language model, in characters
    pub transcript_prefix_chars: usize,
    /// Number of moments requested from the language model
    pub target_clip_count: usize,
    /// Shortest clip length mentioned in the prompt
    pub clip_min_secs: u32,
    /// Longest clip length mentioned in the prompt
    pub clip_max_secs: u32,
    /// Acquisition tool timeout
    pub acquisition_timeout: Duration,
    /// Per-clip encode timeout
    pub encode_timeout: Duration,
    /// Encoding settings applied to every clip
    pub encoding: EncodingConfig,
    /// Gemini API key; no language model is used without one
    pub gemini_api_key: Option<String>,
    /// Gemini model name
    pub gemini_model: String,
    /// Gemini REST base URL
    pub gemini_base_url: String,
    /// Language model request timeout
    pub llm_timeout: Duration,
}

impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("scratch_dir", &self.scratch_dir)
            .field("caption_languages", &self.caption_languages)
            .field("auto_captions", &self.auto_captions)
            .field("max_video_height", &self.max_video_height)
            .field("cookies_file", &self.cookies_file)
            .field("transcript_prefix_chars", &self.transcript_prefix_chars)
            .field("target_clip_count", &self.target_clip_count)
            .field("clip_min_secs", &self.clip_min_secs)
            .field("clip_max_secs", &self.clip_max_secs)
            .field("acquisition_timeout", &self.acquisition_timeout)
            .field("encode_timeout", &self.encode_timeout)
            .field("encoding", &self.encoding)
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "<redacted>"))
            .field("gemini_model", &self.gemini_model)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("llm_timeout", &self.llm_timeout)
            .finish()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scratch_dir: PathBuf::from("/tmp/hclip"),
            caption_languages: vec!["id".to_string(), "en".to_string()],
            auto_captions: false,
            max_video_height: 480,
            cookies_file: None,
            transcript_prefix_chars: 3000,
            target_clip_count: 4,
            clip_min_secs: 15,
            clip_max_secs: 45,
            acquisition_timeout: Duration::from_secs(900),
            encode_timeout: Duration::from_secs(300),
            encoding: EncodingConfig::default(),
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            llm_timeout: Duration::from_secs(60),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            scratch_dir: std::env::var("SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.scratch_dir),
            caption_languages: std::env::var("CAPTION_LANGUAGES")
                .ok()
                .map(|s| parse_languages(&s))
                .filter(|langs| !langs.is_empty())
                .unwrap_or(defaults.caption_languages),
            auto_captions: std::env::var("AUTO_CAPTIONS")
                .map(|v| parse_bool(&v))
                .unwrap_or(defaults.auto_captions),
            max_video_height: env_parse("MAX_VIDEO_HEIGHT").unwrap_or(defaults.max_video_height),
            cookies_file: std::env::var("YTDLP_COOKIES_FILE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            transcript_prefix_chars: env_parse("TRANSCRIPT_PREFIX_CHARS")
                .unwrap_or(defaults.transcript_prefix_chars),
            target_clip_count: env_parse("TARGET_CLIP_COUNT")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.target_clip_count),
            clip_min_secs: env_parse("CLIP_MIN_SECS").unwrap_or(defaults.clip_min_secs),
            clip_max_secs: env_parse("CLIP_MAX_SECS").unwrap_or(defaults.clip_max_secs),
            acquisition_timeout: Duration::from_secs(
                env_parse("ACQUISITION_TIMEOUT_SECS").unwrap_or(900),
            ),
            encode_timeout: Duration::from_secs(env_parse("ENCODE_TIMEOUT_SECS").unwrap_or(300)),
            encoding: defaults.encoding,
            gemini_api_key: std::env::var("GEMINI_API_KEY")
                .or_else(|_| std::env::var("GOOGLE_API_KEY"))
                .ok()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            gemini_model: std::env::var("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            gemini_base_url: std::env::var("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            llm_timeout: Duration::from_secs(env_parse("LLM_TIMEOUT_SECS").unwrap_or(60)),
        }
    }

    /// Options for the yt-dlp acquisition call.
    pub fn download_options(&self) -> DownloadOptions {
        DownloadOptions {
            languages: self.caption_languages.clone(),
            auto_captions: self.auto_captions,
            max_height: self.max_video_height,
            timeout_secs: self.acquisition_timeout.as_secs(),
            cookies_file: self.cookies_file.clone(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Parse a comma separated language list, dropping blanks.
fn parse_languages(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.caption_languages, vec!["id", "en"]);
        assert_eq!(config.target_clip_count, 4);
        assert_eq!(config.transcript_prefix_chars, 3000);
        assert_eq!(config.encode_timeout, Duration::from_secs(300));
        assert!(config.gemini_api_key.is_none());
    }

    #[test]
    fn test_parse_languages() {
        assert_eq!(parse_languages("id, en,,"), vec!["id", "en"]);
        assert!(parse_languages(" , ").is_empty());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("TRUE"));
        assert!(parse_bool("1"));
        assert!(!parse_bool("no"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = PipelineConfig {
            gemini_api_key: Some("secret-key".to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_download_options() {
        let options = PipelineConfig::default().download_options();
        assert_eq!(options.max_height, 480);
        assert_eq!(options.timeout_secs, 900);
        assert_eq!(options.languages, vec!["id", "en"]);
    }
}
