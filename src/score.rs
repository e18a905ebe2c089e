// 🔢 Score Encoding - points.centres decimals and per-shot strings
//
// A recorded score like 149.6 means 149 points with 6 centre shots. The
// fraction holds one digit, so 0-9 centres are representable; anything that
// rounds to ten centres is rejected instead of silently overflowing into
// the points.

use crate::error::ScoreError;
use serde::{Deserialize, Serialize};

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

// ============================================================================
// SCORE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub points: u32,
    pub centres: u32,
}

impl Score {
    pub const MAX_CENTRES: u32 = 9;

    pub fn new(points: u32, centres: u32) -> Result<Self, ScoreError> {
        if centres > Self::MAX_CENTRES {
            return Err(ScoreError::CentresOutOfRange {
                score: points as f64 + centres as f64 / 10.0,
                centres,
            });
        }
        Ok(Score { points, centres })
    }

    /// Split a recorded decimal into whole points and the centre count held
    /// in the first decimal place (rounded to the nearest tenth).
    pub fn from_decimal(value: f64) -> Result<Self, ScoreError> {
        if !value.is_finite() || value < 0.0 {
            return Err(ScoreError::InvalidValue(value));
        }

        let points = value.trunc();
        let centres = ((value - points) * 10.0).round() as u32;
        if centres > Self::MAX_CENTRES {
            return Err(ScoreError::CentresOutOfRange {
                score: value,
                centres,
            });
        }

        Ok(Score {
            points: points as u32,
            centres,
        })
    }

    /// Back to the recorded decimal form, e.g. 56.4
    pub fn to_decimal(&self) -> f64 {
        round_to(self.points as f64 + self.centres as f64 / 10.0, 2)
    }

    /// Points plus centres, the quantity the MCSI transform scales
    pub fn combined(&self) -> u32 {
        self.points + self.centres
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.points, self.centres)
    }
}

// ============================================================================
// SHOTS
// ============================================================================

/// Centre markers on the standard (V) and the six-ring (X) target scales
pub const CENTRE_MARKERS: [char; 2] = ['V', 'X'];

/// One shot of a string, numbered from 1 in firing order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotRecord {
    pub number: u32,
    pub value: char,
}

impl ShotRecord {
    pub fn is_centre(&self) -> bool {
        CENTRE_MARKERS.contains(&self.value)
    }
}

/// Explode a raw shot string into numbered shots.
///
/// Values are upper-cased; whitespace separators are skipped.
pub fn parse_shots(raw: &str) -> Vec<ShotRecord> {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .enumerate()
        .map(|(i, value)| ShotRecord {
            number: i as u32 + 1,
            value,
        })
        .collect()
}

pub fn count_centres(shots: &[ShotRecord]) -> u32 {
    shots.iter().filter(|s| s.is_centre()).count() as u32
}

/// A score whose centre fraction disagrees with its shot string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouplingMismatch {
    pub encoded_centres: u32,
    pub counted_centres: u32,
}

/// Check that the centre count encoded in the score matches the centre
/// markers in its shots. An empty shot list has nothing to check.
pub fn check_coupling(score: &Score, shots: &[ShotRecord]) -> Result<(), CouplingMismatch> {
    if shots.is_empty() {
        return Ok(());
    }
    let counted = count_centres(shots);
    if counted == score.centres {
        Ok(())
    } else {
        Err(CouplingMismatch {
            encoded_centres: score.centres,
            counted_centres: counted,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_decimal_splits_points_and_centres() {
        let score = Score::from_decimal(149.6).unwrap();
        assert_eq!(score.points, 149);
        assert_eq!(score.centres, 6);
        assert_eq!(score.combined(), 155);

        let score = Score::from_decimal(50.0).unwrap();
        assert_eq!(score, Score { points: 50, centres: 0 });
    }

    #[test]
    fn test_from_decimal_rounds_to_nearest_tenth() {
        assert_eq!(Score::from_decimal(58.39).unwrap().centres, 4);
        assert_eq!(Score::from_decimal(58.41).unwrap().centres, 4);
        assert_eq!(Score::from_decimal(58.9).unwrap().centres, 9);
    }

    #[test]
    fn test_ten_centres_is_an_error() {
        let err = Score::from_decimal(49.96).unwrap_err();
        assert_eq!(
            err,
            ScoreError::CentresOutOfRange {
                score: 49.96,
                centres: 10
            }
        );
        assert!(Score::new(49, 10).is_err());
    }

    #[test]
    fn test_negative_and_nan_rejected() {
        assert!(matches!(
            Score::from_decimal(-1.0),
            Err(ScoreError::InvalidValue(_))
        ));
        assert!(Score::from_decimal(f64::NAN).is_err());
    }

    #[test]
    fn test_to_decimal_and_display() {
        let score = Score::new(56, 4).unwrap();
        assert_eq!(score.to_decimal(), 56.4);
        assert_eq!(score.to_string(), "56.4");
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(259.50000001, 2), 259.5);
        assert_eq!(round_to(1.005 * 100.0, 0), 100.0);
        assert_eq!(round_to(12.3456, 2), 12.35);
    }

    #[test]
    fn test_parse_shots_numbers_and_uppercases() {
        let shots = parse_shots("5v4 x");
        assert_eq!(
            shots,
            vec![
                ShotRecord { number: 1, value: '5' },
                ShotRecord { number: 2, value: 'V' },
                ShotRecord { number: 3, value: '4' },
                ShotRecord { number: 4, value: 'X' },
            ]
        );
        assert!(parse_shots("").is_empty());
    }

    #[test]
    fn test_coupling_check() {
        let shots = parse_shots("VV55V4");
        let good = Score::from_decimal(28.3).unwrap();
        let bad = Score::from_decimal(28.1).unwrap();

        assert!(check_coupling(&good, &shots).is_ok());
        assert_eq!(
            check_coupling(&bad, &shots),
            Err(CouplingMismatch {
                encoded_centres: 1,
                counted_centres: 3
            })
        );
        assert!(check_coupling(&bad, &[]).is_ok());
    }
}
