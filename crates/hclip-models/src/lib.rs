//! Shared data models for the highlight clip pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Submit requests and result manifests
//! - Acquired media and caption tracks
//! - Transcripts
//! - Candidate and validated highlight moments
//! - Rendered clips
//! - Encoding configuration

pub mod clip;
pub mod encoding;
pub mod media;
pub mod moment;
pub mod request;
pub mod transcript;

// Re-export common types
pub use clip::{ClipSummary, RenderedClip};
pub use encoding::EncodingConfig;
pub use media::{AcquiredMedia, CaptionTrack, MediaId};
pub use moment::{BoundsViolation, Moment, ValidatedMoment};
pub use request::{ResultManifest, SourceRequest};
pub use transcript::Transcript;
