//! Submit request and result manifest.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::clip::{ClipSummary, RenderedClip};

/// Caller's input: a reference to a source video.
///
/// `url` is optional at the serde level so a missing field surfaces as an
/// invalid request rather than a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, JsonSchema)]
pub struct SourceRequest {
    #[serde(default)]
    #[validate(url)]
    pub url: Option<String>,
}

impl SourceRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
        }
    }

    /// The URL with surrounding whitespace removed, if non-empty.
    pub fn trimmed_url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// Final response payload: source title plus every rendered clip, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ResultManifest {
    pub original_title: String,
    pub clips: Vec<ClipSummary>,
}

impl ResultManifest {
    /// Build a manifest from rendered clips, preserving their order.
    pub fn from_rendered(original_title: impl Into<String>, clips: &[RenderedClip]) -> Self {
        Self {
            original_title: original_title.into(),
            clips: clips.iter().map(RenderedClip::summary).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_url_deserializes() {
        let req: SourceRequest = serde_json::from_str("{}").unwrap();
        assert!(req.trimmed_url().is_none());
    }

    #[test]
    fn test_blank_url_is_none() {
        assert!(SourceRequest::new("   ").trimmed_url().is_none());
        assert_eq!(
            SourceRequest::new(" https://youtu.be/abc ").trimmed_url(),
            Some("https://youtu.be/abc")
        );
    }

    #[test]
    fn test_url_validation() {
        assert!(SourceRequest::new("https://www.youtube.com/watch?v=abc")
            .validate()
            .is_ok());
        assert!(SourceRequest::new("not a url").validate().is_err());
    }

    #[test]
    fn test_empty_manifest_serializes() {
        let manifest = ResultManifest::from_rendered("Title", &[]);
        let json = serde_json::to_value(&manifest).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "original_title": "Title", "clips": [] })
        );
    }
}
