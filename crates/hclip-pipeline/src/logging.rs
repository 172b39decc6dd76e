//! Structured request logging utilities.
//!
//! Provides consistent, structured logging for pipeline requests with
//! tracing spans and contextual information.

use tracing::{error, info, warn, Span};

/// Request logger for structured logging with consistent formatting.
///
/// Every event carries the request id and the operation name so one
/// request's lifecycle can be followed across stages.
#[derive(Debug, Clone)]
pub struct RequestLogger {
    request_id: String,
    operation: String,
}

impl RequestLogger {
    /// Create a new logger for a specific request and operation.
    ///
    /// # Arguments
    /// * `request_id` - The unique identifier for the request
    /// * `operation` - The type of operation (e.g., "process_video")
    pub fn new(request_id: impl ToString, operation: &str) -> Self {
        Self {
            request_id: request_id.to_string(),
            operation: operation.to_string(),
        }
    }

    /// Log the start of a request.
    pub fn log_start(&self, message: &str) {
        info!(
            request_id = %self.request_id,
            operation = %self.operation,
            "Request started: {}", message
        );
    }

    /// Log a stage transition or progress update.
    pub fn log_progress(&self, message: &str) {
        info!(
            request_id = %self.request_id,
            operation = %self.operation,
            "Request progress: {}", message
        );
    }

    /// Log a recovered problem.
    pub fn log_warning(&self, message: &str) {
        warn!(
            request_id = %self.request_id,
            operation = %self.operation,
            "Request warning: {}", message
        );
    }

    /// Log a request-ending error.
    pub fn log_error(&self, message: &str) {
        error!(
            request_id = %self.request_id,
            operation = %self.operation,
            "Request error: {}", message
        );
    }

    /// Log the completion of a request.
    pub fn log_completion(&self, message: &str) {
        info!(
            request_id = %self.request_id,
            operation = %self.operation,
            "Request completed: {}", message
        );
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Create a tracing span for this request.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "request",
            request_id = %self.request_id,
            operation = %self.operation
        )
    }
}
