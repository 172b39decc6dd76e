//! Normalized transcript model.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Plain-text transcript derived from a caption track.
///
/// An unavailable transcript is a valid, degraded state: it routes moment
/// selection straight to the fallback list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Transcript {
    /// Normalized text (empty when unavailable)
    pub text: String,
    /// Language of the caption track the text came from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Whether any usable transcript text exists
    pub available: bool,
}

impl Transcript {
    /// Create an available transcript.
    ///
    /// Blank text is treated as unavailable.
    pub fn new(text: impl Into<String>, language: impl Into<String>) -> Self {
        let text = text.into();
        if text.trim().is_empty() {
            return Self::unavailable();
        }
        Self {
            text,
            language: Some(language.into()),
            available: true,
        }
    }

    /// A transcript marking the absence of captions.
    pub fn unavailable() -> Self {
        Self {
            text: String::new(),
            language: None,
            available: false,
        }
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    /// The first `max_chars` characters of the text (character-boundary safe).
    pub fn prefix(&self, max_chars: usize) -> &str {
        match self.text.char_indices().nth(max_chars) {
            Some((byte_idx, _)) => &self.text[..byte_idx],
            None => &self.text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_text_is_unavailable() {
        let t = Transcript::new("   ", "en");
        assert!(!t.is_available());
        assert_eq!(t, Transcript::unavailable());
    }

    #[test]
    fn test_prefix_respects_char_boundaries() {
        let t = Transcript::new("héllo wörld", "en");
        assert_eq!(t.prefix(2), "hé");
        assert_eq!(t.prefix(100), "héllo wörld");
        assert_eq!(t.prefix(0), "");
    }
}
