//! Display score heuristic.
//!
//! The score shown next to each clip is a presentation value, not a
//! quality measurement.

use std::ops::RangeInclusive;

use rand::Rng;

/// Range of the default display score.
pub const DISPLAY_SCORE_RANGE: RangeInclusive<u8> = 70..=98;

/// Assigns a display score to a rendered clip.
pub trait ClipScorer: Send + Sync {
    fn score(&self) -> u8;
}

/// Uniform pseudo-random score in [`DISPLAY_SCORE_RANGE`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomDisplayScore;

impl ClipScorer for RandomDisplayScore {
    fn score(&self) -> u8 {
        rand::rng().random_range(DISPLAY_SCORE_RANGE)
    }
}

/// Always returns the same score.
#[derive(Debug, Clone, Copy)]
pub struct FixedScore(pub u8);

impl ClipScorer for FixedScore {
    fn score(&self) -> u8 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_score_in_range() {
        let scorer = RandomDisplayScore;
        for _ in 0..1000 {
            assert!(DISPLAY_SCORE_RANGE.contains(&scorer.score()));
        }
    }

    #[test]
    fn test_fixed_score() {
        assert_eq!(FixedScore(77).score(), 77);
    }
}
