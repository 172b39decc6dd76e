//! Moment selection: language-model proposals with a fixed fallback.
//!
//! Model output is untrusted text. It is accepted only when it parses as a
//! non-empty JSON array whose every element has exactly `start_time`,
//! `end_time` and a non-blank `title`; anything else falls back to
//! [`fallback_moments`].

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use hclip_models::{Moment, Transcript};

use crate::config::PipelineConfig;
use crate::llm::{LanguageModel, LlmError};
use crate::metrics;

/// Deterministic moments used whenever the model cannot be used.
pub const FALLBACK_MOMENTS: [(u32, u32, &str); 2] = [
    (10, 30, "Highlight 1 (auto)"),
    (40, 60, "Highlight 2 (auto)"),
];

/// The fallback list as moments.
pub fn fallback_moments() -> Vec<Moment> {
    FALLBACK_MOMENTS
        .iter()
        .map(|(start, end, title)| Moment::new(*start, *end, *title))
        .collect()
}

/// Why a model response was rejected.
#[derive(Debug, Error)]
pub enum MomentSelectionError {
    #[error("model call failed: {0}")]
    ModelCall(#[from] LlmError),

    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("response is not a JSON array")]
    NotAnArray,

    #[error("response array is empty")]
    Empty,

    #[error("element {index} does not match the moment schema: {reason}")]
    SchemaMismatch { index: usize, reason: String },
}

impl MomentSelectionError {
    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ModelCall(_) => "model_call_failed",
            Self::InvalidJson(_) => "invalid_json",
            Self::NotAnArray => "not_an_array",
            Self::Empty => "empty",
            Self::SchemaMismatch { .. } => "schema_mismatch",
        }
    }
}

/// Why the fallback list was used.
#[derive(Debug)]
pub enum FallbackReason {
    TranscriptUnavailable,
    NoLanguageModel,
    Rejected(MomentSelectionError),
}

impl FallbackReason {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TranscriptUnavailable => "transcript_unavailable",
            Self::NoLanguageModel => "no_language_model",
            Self::Rejected(e) => e.kind(),
        }
    }
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TranscriptUnavailable => write!(f, "transcript unavailable"),
            Self::NoLanguageModel => write!(f, "no language model configured"),
            Self::Rejected(e) => write!(f, "{}", e),
        }
    }
}

/// Outcome of moment selection. `moments` is never empty.
#[derive(Debug)]
pub struct MomentSelection {
    pub moments: Vec<Moment>,
    pub fallback: Option<FallbackReason>,
}

impl MomentSelection {
    pub fn used_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

/// Prompt parameters.
#[derive(Debug, Clone)]
pub struct SelectionPolicy {
    pub target_count: usize,
    pub min_secs: u32,
    pub max_secs: u32,
    pub prefix_chars: usize,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            target_count: 4,
            min_secs: 15,
            max_secs: 45,
            prefix_chars: 3000,
        }
    }
}

impl From<&PipelineConfig> for SelectionPolicy {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            target_count: config.target_clip_count,
            min_secs: config.clip_min_secs,
            max_secs: config.clip_max_secs,
            prefix_chars: config.transcript_prefix_chars,
        }
    }
}

/// Selects candidate moments from a transcript.
pub struct MomentSelector {
    model: Option<Arc<dyn LanguageModel>>,
    policy: SelectionPolicy,
}

impl MomentSelector {
    pub fn new(model: Option<Arc<dyn LanguageModel>>, policy: SelectionPolicy) -> Self {
        Self { model, policy }
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Pick moments for `transcript`. Never fails; see [`MomentSelection`].
    pub async fn select(&self, transcript: &Transcript) -> MomentSelection {
        if !transcript.is_available() {
            return self.fallback(FallbackReason::TranscriptUnavailable);
        }

        let Some(model) = self.model.as_ref() else {
            return self.fallback(FallbackReason::NoLanguageModel);
        };

        let prompt = build_prompt(transcript.prefix(self.policy.prefix_chars), &self.policy);

        let result = match model.generate(&prompt).await {
            Ok(text) => parse_moments(&text),
            Err(e) => Err(MomentSelectionError::from(e)),
        };

        match result {
            Ok(mut moments) => {
                let proposed = moments.len();
                moments.truncate(self.policy.target_count);
                info!(
                    proposed = proposed,
                    kept = moments.len(),
                    "Language model proposed moments"
                );
                MomentSelection {
                    moments,
                    fallback: None,
                }
            }
            Err(e) => self.fallback(FallbackReason::Rejected(e)),
        }
    }

    fn fallback(&self, reason: FallbackReason) -> MomentSelection {
        match &reason {
            FallbackReason::Rejected(_) => {
                warn!(reason = reason.kind(), "Moment selection failed, using fallback: {}", reason)
            }
            _ => info!(reason = reason.kind(), "Using fallback moments: {}", reason),
        }
        metrics::record_moment_fallback(reason.kind());

        MomentSelection {
            moments: fallback_moments(),
            fallback: Some(reason),
        }
    }
}

/// Build the moment-selection prompt around a transcript excerpt.
pub fn build_prompt(transcript: &str, policy: &SelectionPolicy) -> String {
    format!(
        "You are a short-form video editor. Below is the transcript of a video.\n\
         Find the {count} most engaging moments, each between {min} and {max} seconds long.\n\
         \n\
         Reply ONLY with a valid JSON array of objects. Each object must have exactly these keys:\n\
         - \"start_time\": start of the moment in whole seconds (integer)\n\
         - \"end_time\": end of the moment in whole seconds (integer)\n\
         - \"title\": a short catchy title of at most 6 words, in the transcript's language\n\
         \n\
         Transcript:\n\
         {transcript}",
        count = policy.target_count,
        min = policy.min_secs,
        max = policy.max_secs,
        transcript = transcript,
    )
}

/// Extract the body of the first Markdown code fence, if any.
///
/// Prose before or after the fence is discarded, and an unclosed fence runs
/// to the end of the text. Text without a fence is returned trimmed.
pub fn strip_code_fences(text: &str) -> &str {
    const FENCE: &str = "```";

    let text = text.trim();
    let Some(open) = text.find(FENCE) else {
        return text;
    };

    let body = &text[open + FENCE.len()..];
    let body = body
        .strip_prefix("json")
        .or_else(|| body.strip_prefix("JSON"))
        .unwrap_or(body);
    let end = body.find(FENCE).unwrap_or(body.len());
    body[..end].trim()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMoment {
    start_time: u32,
    end_time: u32,
    title: String,
}

/// Strictly parse model output into moments.
pub fn parse_moments(text: &str) -> Result<Vec<Moment>, MomentSelectionError> {
    let value: serde_json::Value = serde_json::from_str(strip_code_fences(text))
        .map_err(|e| MomentSelectionError::InvalidJson(e.to_string()))?;

    let items = match value {
        serde_json::Value::Array(items) => items,
        _ => return Err(MomentSelectionError::NotAnArray),
    };

    if items.is_empty() {
        return Err(MomentSelectionError::Empty);
    }

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let raw: RawMoment = serde_json::from_value(item).map_err(|e| {
                MomentSelectionError::SchemaMismatch {
                    index,
                    reason: e.to_string(),
                }
            })?;

            let title = raw.title.trim();
            if title.is_empty() {
                return Err(MomentSelectionError::SchemaMismatch {
                    index,
                    reason: "blank title".to_string(),
                });
            }

            Ok(Moment::new(raw.start_time, raw.end_time, title))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLanguageModel;

    fn transcript() -> Transcript {
        Transcript::new("hello everyone welcome to the show", "en")
    }

    fn selector_with(mock: MockLanguageModel) -> MomentSelector {
        MomentSelector::new(Some(Arc::new(mock)), SelectionPolicy::default())
    }

    fn is_fallback(moments: &[Moment]) -> bool {
        moments == fallback_moments().as_slice()
    }

    #[test]
    fn test_fallback_list() {
        let moments = fallback_moments();
        assert_eq!(moments.len(), 2);
        assert_eq!(moments[0], Moment::new(10, 30, "Highlight 1 (auto)"));
        assert_eq!(moments[1], Moment::new(40, 60, "Highlight 2 (auto)"));
    }

    #[test]
    fn test_parse_fenced_response() {
        let text = "```json\n[{\"start_time\":5,\"end_time\":20,\"title\":\"Hook\"}]\n```";
        let moments = parse_moments(text).unwrap();
        assert_eq!(moments, vec![Moment::new(5, 20, "Hook")]);
    }

    #[test]
    fn test_parse_bare_fence() {
        let text = "```\n[{\"start_time\":1,\"end_time\":2,\"title\":\" A \"}]\n```";
        assert_eq!(parse_moments(text).unwrap(), vec![Moment::new(1, 2, "A")]);
    }

    #[test]
    fn test_fence_surrounded_by_prose() {
        let text = "Here are the highlights:\n```json\n[{\"start_time\":3,\"end_time\":9,\"title\":\"Intro\"}]\n```\nEnjoy!";
        assert_eq!(parse_moments(text).unwrap(), vec![Moment::new(3, 9, "Intro")]);
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("  [1]  "), "[1]");
        assert_eq!(strip_code_fences("```json[1]```"), "[1]");
        assert_eq!(strip_code_fences("```JSON\n[1]"), "[1]");
        assert_eq!(strip_code_fences("text\n```\n[1]\n```\n```\n[2]\n```"), "[1]");
    }

    #[test]
    fn test_parse_rejections() {
        assert!(matches!(
            parse_moments("not json"),
            Err(MomentSelectionError::InvalidJson(_))
        ));
        assert!(matches!(
            parse_moments("{\"start_time\":1}"),
            Err(MomentSelectionError::NotAnArray)
        ));
        assert!(matches!(parse_moments("[]"), Err(MomentSelectionError::Empty)));

        let cases = [
            r#"[{"start_time":1,"end_time":2}]"#,
            r#"[{"start_time":-1,"end_time":2,"title":"x"}]"#,
            r#"[{"start_time":"1","end_time":2,"title":"x"}]"#,
            r#"[{"start_time":1.5,"end_time":2,"title":"x"}]"#,
            r#"[{"start_time":1,"end_time":2,"title":"x","score":9}]"#,
            r#"[{"start_time":1,"end_time":2,"title":"   "}]"#,
            r#"[{"start_time":1,"end_time":2,"title":"ok"}, 7]"#,
        ];
        for case in cases {
            assert!(
                matches!(
                    parse_moments(case),
                    Err(MomentSelectionError::SchemaMismatch { .. })
                ),
                "expected schema mismatch for {}",
                case
            );
        }
    }

    #[test]
    fn test_prompt_contents() {
        let policy = SelectionPolicy::default();
        let prompt = build_prompt("TEXT", &policy);
        assert!(prompt.contains("4 most engaging moments"));
        assert!(prompt.contains("between 15 and 45 seconds"));
        assert!(prompt.contains("\"start_time\""));
        assert!(prompt.contains("at most 6 words"));
        assert!(prompt.ends_with("TEXT"));
    }

    #[tokio::test]
    async fn test_model_response_used() {
        let mut mock = MockLanguageModel::new();
        mock.expect_generate().times(1).returning(|_| {
            Ok("```json\n[{\"start_time\":5,\"end_time\":20,\"title\":\"Hook\"}]\n```".to_string())
        });

        let selection = selector_with(mock).select(&transcript()).await;
        assert!(!selection.used_fallback());
        assert_eq!(selection.moments, vec![Moment::new(5, 20, "Hook")]);
    }

    #[tokio::test]
    async fn test_prompt_uses_bounded_prefix() {
        let long_text = "a".repeat(5000);
        let mut mock = MockLanguageModel::new();
        mock.expect_generate()
            .withf(|prompt: &str| prompt.ends_with(&"a".repeat(3000)) && !prompt.contains(&"a".repeat(3001)))
            .times(1)
            .returning(|_| Ok("[]".to_string()));

        let selection = selector_with(mock)
            .select(&Transcript::new(long_text, "en"))
            .await;
        assert!(selection.used_fallback());
    }

    #[tokio::test]
    async fn test_truncates_to_target_count() {
        let mut mock = MockLanguageModel::new();
        mock.expect_generate().returning(|_| {
            let items: Vec<String> = (0..6)
                .map(|i| format!("{{\"start_time\":{},\"end_time\":{},\"title\":\"M{}\"}}", i * 10, i * 10 + 5, i))
                .collect();
            Ok(format!("[{}]", items.join(",")))
        });

        let selection = selector_with(mock).select(&transcript()).await;
        assert_eq!(selection.moments.len(), 4);
        assert_eq!(selection.moments[3].title, "M3");
    }

    #[tokio::test]
    async fn test_model_error_falls_back() {
        let mut mock = MockLanguageModel::new();
        mock.expect_generate()
            .times(1)
            .returning(|_| Err(LlmError::Request("connection refused".to_string())));

        let selection = selector_with(mock).select(&transcript()).await;
        assert!(is_fallback(&selection.moments));
        assert_eq!(
            selection.fallback.as_ref().map(FallbackReason::kind),
            Some("model_call_failed")
        );
    }

    #[tokio::test]
    async fn test_unparseable_output_falls_back() {
        let mut mock = MockLanguageModel::new();
        mock.expect_generate()
            .returning(|_| Ok("Here are your moments: none".to_string()));

        let selection = selector_with(mock).select(&transcript()).await;
        assert!(is_fallback(&selection.moments));
    }

    #[tokio::test]
    async fn test_unavailable_transcript_skips_model() {
        let mut mock = MockLanguageModel::new();
        mock.expect_generate().never();

        let selection = selector_with(mock).select(&Transcript::unavailable()).await;
        assert!(is_fallback(&selection.moments));
        assert!(matches!(
            selection.fallback,
            Some(FallbackReason::TranscriptUnavailable)
        ));
    }

    #[tokio::test]
    async fn test_no_model_falls_back() {
        let selector = MomentSelector::new(None, SelectionPolicy::default());
        let selection = selector.select(&transcript()).await;
        assert!(is_fallback(&selection.moments));
        assert!(matches!(selection.fallback, Some(FallbackReason::NoLanguageModel)));
    }
}
