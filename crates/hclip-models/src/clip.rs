//! Rendered clip models.

use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::moment::ValidatedMoment;

/// An encoded highlight clip on disk.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct RenderedClip {
    /// Artifact path relative to the artifact root (`<request_id>/<file>`)
    pub filename: String,
    /// Absolute path of the encoded file
    pub path: PathBuf,
    /// Display title
    pub title: String,
    /// Display score (heuristic, see `hclip_pipeline::scoring`)
    pub score: u8,
    /// The moment this clip was cut from
    pub moment: ValidatedMoment,
}

impl RenderedClip {
    /// Manifest entry for this clip.
    pub fn summary(&self) -> ClipSummary {
        ClipSummary {
            title: self.title.clone(),
            filename: self.filename.clone(),
            viral_score: self.score,
        }
    }
}

/// A clip as it appears in the result manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClipSummary {
    pub title: String,
    pub filename: String,
    #[serde(rename = "viralScore")]
    pub viral_score: u8,
}
