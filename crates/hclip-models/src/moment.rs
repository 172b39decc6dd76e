//! Highlight moment models and bounds validation.
//!
//! A [`Moment`] is a proposed highlight span expressed in whole seconds. It only
//! becomes a [`ValidatedMoment`] after its bounds have been checked against the
//! probed duration of the source media, so an encode can never be issued for a
//! span that does not fit the video.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A candidate highlight span (pre-validation).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Moment {
    /// Start offset in seconds
    pub start: u32,
    /// End offset in seconds (exclusive)
    pub end: u32,
    /// Short display title
    pub title: String,
}

impl Moment {
    /// Create a new candidate moment.
    pub fn new(start: u32, end: u32, title: impl Into<String>) -> Self {
        Self {
            start,
            end,
            title: title.into(),
        }
    }

    /// Span length in seconds (zero for inverted spans).
    pub fn duration_secs(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Check this moment against the media duration.
    ///
    /// A moment is valid when `start < end`, `start < duration` and
    /// `end <= duration`. Invalid moments are rejected, never clamped.
    pub fn validate_within(&self, duration_secs: f64) -> Result<ValidatedMoment, BoundsViolation> {
        if self.start >= self.end {
            return Err(BoundsViolation::EmptyRange {
                start: self.start,
                end: self.end,
            });
        }

        if !duration_secs.is_finite() || f64::from(self.start) >= duration_secs {
            return Err(BoundsViolation::StartBeyondDuration {
                start: self.start,
                duration_secs,
            });
        }

        if f64::from(self.end) > duration_secs {
            return Err(BoundsViolation::EndBeyondDuration {
                end: self.end,
                duration_secs,
            });
        }

        Ok(ValidatedMoment {
            moment: self.clone(),
        })
    }
}

/// A moment whose bounds are known to satisfy `0 <= start < end <= duration`.
///
/// Only constructible through [`Moment::validate_within`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(transparent)]
pub struct ValidatedMoment {
    moment: Moment,
}

impl ValidatedMoment {
    pub fn start(&self) -> u32 {
        self.moment.start
    }

    pub fn end(&self) -> u32 {
        self.moment.end
    }

    pub fn title(&self) -> &str {
        &self.moment.title
    }

    /// Span length in seconds (always positive).
    pub fn duration_secs(&self) -> u32 {
        self.moment.end - self.moment.start
    }

    /// The underlying candidate.
    pub fn as_moment(&self) -> &Moment {
        &self.moment
    }
}

/// Why a moment does not fit the source media.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundsViolation {
    /// Start is not strictly before end
    EmptyRange { start: u32, end: u32 },
    /// Start lies at or past the end of the media
    StartBeyondDuration { start: u32, duration_secs: f64 },
    /// End lies past the end of the media
    EndBeyondDuration { end: u32, duration_secs: f64 },
}

impl std::fmt::Display for BoundsViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyRange { start, end } => {
                write!(f, "Start ({}s) must be before end ({}s)", start, end)
            }
            Self::StartBeyondDuration {
                start,
                duration_secs,
            } => write!(
                f,
                "Start ({}s) is not within media duration ({:.1}s)",
                start, duration_secs
            ),
            Self::EndBeyondDuration { end, duration_secs } => write!(
                f,
                "End ({}s) exceeds media duration ({:.1}s)",
                end, duration_secs
            ),
        }
    }
}

impl std::error::Error for BoundsViolation {}
