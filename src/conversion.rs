// 🔁 Score Conversion Engine - six-ring target → standard target
//
// Some historical results were shot on a target whose top ring scores 6
// (centre marker X). Rescaling to the standard target (top ring 5, centre
// marker V) costs one point per top-ring shot; centres stay centres.

use crate::error::ScoreError;
use crate::score::{round_to, Score};
use serde::{Deserialize, Serialize};

// ============================================================================
// TARGET SCALES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetScale {
    /// Highest scoring digit on this target
    pub max_value: char,

    /// Marker recorded for a centre shot
    pub centre: char,
}

impl TargetScale {
    pub const SIX_RING: TargetScale = TargetScale {
        max_value: '6',
        centre: 'X',
    };

    pub const STANDARD: TargetScale = TargetScale {
        max_value: '5',
        centre: 'V',
    };
}

// ============================================================================
// CONVERSION OUTCOME
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertedScore {
    pub score: Score,

    /// Recorded decimal form, rounded to two places
    pub value: f64,

    /// Shot string on the standard scale (empty when none was recorded)
    pub shots: String,

    /// Number of top-ring shots that lost a point
    pub downgraded: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConversionOutcome {
    Converted(ConvertedScore),

    /// No score was recorded, so there is nothing to convert
    NotApplicable,
}

// ============================================================================
// ENGINE
// ============================================================================

#[derive(Debug, Clone)]
pub struct ScoreConversionEngine {
    pub from: TargetScale,
    pub to: TargetScale,
}

impl ScoreConversionEngine {
    pub fn new() -> Self {
        ScoreConversionEngine {
            from: TargetScale::SIX_RING,
            to: TargetScale::STANDARD,
        }
    }

    /// Rescale `score` and its shot string.
    ///
    /// Missing shots are treated as containing no top-ring shots, so the
    /// points pass through unchanged.
    pub fn convert(
        &self,
        score: Option<f64>,
        raw_shots: Option<&str>,
    ) -> Result<ConversionOutcome, ScoreError> {
        let Some(value) = score else {
            return Ok(ConversionOutcome::NotApplicable);
        };
        let original = Score::from_decimal(value)?;
        let raw_shots = raw_shots.unwrap_or("");

        let downgraded = raw_shots
            .chars()
            .filter(|&c| c == self.from.max_value)
            .count() as u32;

        let shots: String = raw_shots.chars().map(|c| self.convert_shot(c)).collect();

        let score = Score {
            points: original.points.saturating_sub(downgraded),
            centres: original.centres,
        };

        Ok(ConversionOutcome::Converted(ConvertedScore {
            score,
            value: round_to(score.points as f64 + score.centres as f64 / 10.0, 2),
            shots,
            downgraded,
        }))
    }

    fn convert_shot(&self, shot: char) -> char {
        if shot.eq_ignore_ascii_case(&self.from.centre) {
            self.to.centre
        } else if shot == self.from.max_value {
            self.to.max_value
        } else {
            shot
        }
    }
}

impl Default for ScoreConversionEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn converted(outcome: ConversionOutcome) -> ConvertedScore {
        match outcome {
            ConversionOutcome::Converted(c) => c,
            ConversionOutcome::NotApplicable => panic!("expected a conversion"),
        }
    }

    #[test]
    fn test_two_sixes_lose_two_points() {
        let engine = ScoreConversionEngine::new();
        let result = converted(engine.convert(Some(58.4), Some("6X55XX5X46")).unwrap());

        assert_eq!(result.downgraded, 2);
        assert_eq!(result.score, Score { points: 56, centres: 4 });
        assert_eq!(result.value, 56.4);
        assert_eq!(result.shots, "5V55VV5V45");
    }

    #[test]
    fn test_converted_shots_have_no_six_ring_values() {
        let engine = ScoreConversionEngine::new();
        let result = converted(engine.convert(Some(33.2), Some("66x6X6")).unwrap());

        assert_eq!(result.score.points, 29);
        assert_eq!(result.score.centres, 2);
        assert!(!result.shots.contains('6'));
        assert!(!result.shots.contains('X'));
        assert!(!result.shots.contains('x'));
    }

    #[test]
    fn test_missing_score_is_not_applicable() {
        let engine = ScoreConversionEngine::new();
        assert_eq!(
            engine.convert(None, Some("666")).unwrap(),
            ConversionOutcome::NotApplicable
        );
    }

    #[test]
    fn test_missing_shots_degrades_to_no_change() {
        let engine = ScoreConversionEngine::new();
        let result = converted(engine.convert(Some(47.3), None).unwrap());

        assert_eq!(result.downgraded, 0);
        assert_eq!(result.value, 47.3);
        assert_eq!(result.shots, "");
    }

    #[test]
    fn test_malformed_score_is_an_error() {
        let engine = ScoreConversionEngine::new();
        assert!(engine.convert(Some(-3.0), Some("6")).is_err());
    }
}
