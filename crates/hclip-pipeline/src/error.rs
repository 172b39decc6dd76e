//! Request-level error taxonomy.

use hclip_media::MediaError;
use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that end a pipeline request.
///
/// Moment selection failures and per-clip render skips are recovered inside
/// the pipeline and never appear here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Acquisition failed: {0}")]
    Acquisition(String),

    #[error("Processing failed: {0}")]
    Fatal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn acquisition(msg: impl Into<String>) -> Self {
        Self::Acquisition(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    /// Whether the caller is at fault (maps to a 4xx response).
    pub fn is_client_error(&self) -> bool {
        matches!(self, PipelineError::InvalidRequest(_))
    }

    /// Stable label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InvalidRequest(_) => "invalid_request",
            PipelineError::Acquisition(_) => "acquisition_failed",
            PipelineError::Fatal(_) | PipelineError::Io(_) => "fatal",
        }
    }
}

impl From<MediaError> for PipelineError {
    fn from(err: MediaError) -> Self {
        PipelineError::Fatal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(PipelineError::invalid_request("missing url").is_client_error());
        assert!(!PipelineError::acquisition("yt-dlp failed").is_client_error());
        assert!(!PipelineError::fatal("probe failed").is_client_error());
    }

    #[test]
    fn test_media_error_is_fatal() {
        let err: PipelineError = MediaError::invalid_video("no video stream").into();
        assert_eq!(err.kind(), "fatal");
        assert!(err.to_string().contains("no video stream"));
    }
}
