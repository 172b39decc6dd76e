//! Acquired source media models.

use std::fmt;
use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Identifier of a source video as reported by the acquisition tool.
///
/// The identifier is sanitized on construction so it can be used verbatim in
/// derived file names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct MediaId(String);

impl MediaId {
    /// Create a file-name-safe identifier.
    ///
    /// Characters outside `[A-Za-z0-9_-]` become `_`; an empty id becomes `video`.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let sanitized: String = raw
            .as_ref()
            .trim()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        if sanitized.is_empty() {
            Self("video".to_string())
        } else {
            Self(sanitized)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Deterministic file name of the `index`-th (1-based) clip of this media.
    pub fn clip_file_name(&self, index: usize) -> String {
        format!("{}_clip_{}.mp4", self.0, index)
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A caption file downloaded alongside the video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CaptionTrack {
    /// Language code the track was requested under (e.g. "en")
    pub language: String,
    /// Local path of the caption file
    pub path: PathBuf,
}

impl CaptionTrack {
    pub fn new(language: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            language: language.into(),
            path: path.into(),
        }
    }
}

/// Local copy of a source video plus its optional captions.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AcquiredMedia {
    /// Source identifier (namespaces derived file names)
    pub media_id: MediaId,
    /// Original video title
    pub title: String,
    /// Local video file
    pub video_path: PathBuf,
    /// Probed duration in seconds
    pub duration_secs: f64,
    /// Caption files that materialized, in no particular order
    #[serde(default)]
    pub captions: Vec<CaptionTrack>,
}

impl AcquiredMedia {
    /// Find the caption track for a language, if one was downloaded.
    pub fn caption_for(&self, language: &str) -> Option<&CaptionTrack> {
        self.captions
            .iter()
            .find(|track| track.language.eq_ignore_ascii_case(language))
    }

    /// Pick the first caption track by language priority.
    pub fn preferred_caption<I, S>(&self, priority: I) -> Option<&CaptionTrack>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        priority
            .into_iter()
            .find_map(|lang| self.caption_for(lang.as_ref()))
    }
}
