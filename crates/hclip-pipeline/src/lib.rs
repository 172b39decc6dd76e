//! Highlight clip pipeline.
//!
//! This crate provides the request pipeline and its stages:
//! - Acquisition of source video and captions
//! - Caption normalization into a transcript
//! - Language-model moment selection with a fixed fallback
//! - Bounded clip rendering with display scores
//! - Result manifest assembly
//! - Per-request scratch namespaces and eviction

pub mod acquire;
pub mod catalog;
pub mod config;
pub mod error;
pub mod gemini;
pub mod llm;
pub mod logging;
pub mod metrics;
pub mod moments;
pub mod pipeline;
pub mod renderer;
pub mod scoring;
pub mod scratch;
pub mod transcript;

pub use acquire::{MediaAcquirer, YtDlpAcquirer};
pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use gemini::GeminiClient;
pub use llm::{create_language_model, LanguageModel, LlmError};
pub use logging::RequestLogger;
pub use moments::{fallback_moments, FallbackReason, MomentSelection, MomentSelector};
pub use pipeline::{validate_request, HighlightPipeline, PipelineOutput};
pub use renderer::{ClipEncoder, ClipRenderer, FfmpegEncoder, RenderSkip};
pub use scoring::{ClipScorer, FixedScore, RandomDisplayScore};
pub use scratch::{RequestScratch, ScratchSpace};
pub use transcript::normalize_text;
