//! Language-model abstraction used by moment selection.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::PipelineConfig;
use crate::gemini::GeminiClient;

/// Errors from a language-model call.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
}

/// A text-in, text-out language model.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send one prompt and return the model's raw text answer.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Build the configured language model, if an API key is present.
pub fn create_language_model(config: &PipelineConfig) -> Option<Arc<dyn LanguageModel>> {
    let api_key = config.gemini_api_key.clone()?;

    match GeminiClient::with_base_url(
        api_key,
        config.gemini_model.clone(),
        config.gemini_base_url.clone(),
        config.llm_timeout,
    ) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            tracing::warn!("Failed to build Gemini client, moment selection will use fallback: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_key_no_client() {
        let config = PipelineConfig::default();
        assert!(create_language_model(&config).is_none());
    }

    #[test]
    fn test_key_builds_client() {
        let config = PipelineConfig {
            gemini_api_key: Some("test-key".to_string()),
            ..Default::default()
        };
        assert!(create_language_model(&config).is_some());
    }
}
