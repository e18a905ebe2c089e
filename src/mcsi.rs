// 📈 MCSI Scoring Engine - Mixed Category Score Index
//
// Disciplines score on incompatible ranges, so a raw 149.6 in Target Rifle
// says nothing about a raw 149.6 in F Open. MCSI applies a per-family
// linear transform to (points + centres) to make them comparable:
//
//   MCSI = (points + centres) × multiplier + offset
//
// A small override table marks historical results that were shot on the
// six-ring target and must be rescaled before the transform.

use crate::conversion::{ConversionOutcome, ScoreConversionEngine};
use crate::disciplines::{DisciplineFamily, DisciplineNormalizer};
use crate::error::{ConfigError, ScoreError};
use crate::score::{round_to, Score};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

// ============================================================================
// PARAMETERS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct McsiParameters {
    pub multiplier: f64,
    pub offset: f64,
}

/// One configured row: which family, which transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyParameters {
    pub family: DisciplineFamily,
    pub multiplier: f64,
    pub offset: f64,
}

/// Family → transform lookup. Families without an entry are not eligible.
#[derive(Debug, Clone, PartialEq)]
pub struct McsiTable {
    params: HashMap<DisciplineFamily, McsiParameters>,
}

impl McsiTable {
    pub fn from_entries(entries: &[FamilyParameters]) -> Result<Self, ConfigError> {
        let mut params = HashMap::new();
        for entry in entries {
            if !entry.multiplier.is_finite() || !entry.offset.is_finite() {
                return Err(ConfigError::InvalidParameters(entry.family.name().to_string()));
            }
            params.insert(
                entry.family,
                McsiParameters {
                    multiplier: entry.multiplier,
                    offset: entry.offset,
                },
            );
        }
        Ok(McsiTable { params })
    }

    pub fn get(&self, family: DisciplineFamily) -> Option<McsiParameters> {
        self.params.get(&family).copied()
    }

    /// Built-in rows
    pub fn default_entries() -> Vec<FamilyParameters> {
        vec![FamilyParameters {
            family: DisciplineFamily::TargetRifle,
            multiplier: 1.62,
            offset: 8.4,
        }]
    }
}

impl Default for McsiTable {
    fn default() -> Self {
        let params = Self::default_entries()
            .into_iter()
            .map(|e| {
                (
                    e.family,
                    McsiParameters {
                        multiplier: e.multiplier,
                        offset: e.offset,
                    },
                )
            })
            .collect();
        McsiTable { params }
    }
}

// ============================================================================
// OVERRIDE RULES
// ============================================================================

/// Historical correction keyed by (region, period, family)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideRule {
    pub region: String,
    pub period: i32,
    pub family: DisciplineFamily,

    /// Whether results matching this rule need six-ring → standard rescaling
    #[serde(default = "default_convert")]
    pub convert: bool,
}

fn default_convert() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverrideTable {
    rules: Vec<OverrideRule>,
}

impl OverrideTable {
    pub fn new(rules: Vec<OverrideRule>) -> Self {
        OverrideTable { rules }
    }

    /// First matching rule decides; no match means no conversion.
    /// Region codes compare case-insensitively.
    pub fn requires_conversion(&self, region: &str, period: i32, family: DisciplineFamily) -> bool {
        self.rules
            .iter()
            .find(|r| {
                r.period == period && r.family == family && r.region.eq_ignore_ascii_case(region)
            })
            .map(|r| r.convert)
            .unwrap_or(false)
    }

    pub fn rules(&self) -> &[OverrideRule] {
        &self.rules
    }
}

// ============================================================================
// OUTCOME
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McsiValue {
    pub value: f64,
    pub canonical: String,
    pub family: DisciplineFamily,

    /// The score the transform was applied to (after any rescaling)
    pub score: Score,
    pub converted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NotEligibleReason {
    /// The discipline's family has no MCSI parameters
    NoParameters(DisciplineFamily),

    /// No score was recorded
    NoScore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum McsiOutcome {
    Eligible(McsiValue),
    NotEligible(NotEligibleReason),
}

impl McsiOutcome {
    pub fn value(&self) -> Option<f64> {
        match self {
            McsiOutcome::Eligible(v) => Some(v.value),
            McsiOutcome::NotEligible(_) => None,
        }
    }

    pub fn is_eligible(&self) -> bool {
        matches!(self, McsiOutcome::Eligible(_))
    }
}

// ============================================================================
// ENGINE
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct McsiEngine {
    normalizer: DisciplineNormalizer,
    params: McsiTable,
    overrides: OverrideTable,
    converter: ScoreConversionEngine,
}

impl McsiEngine {
    pub fn new(normalizer: DisciplineNormalizer, params: McsiTable, overrides: OverrideTable) -> Self {
        McsiEngine {
            normalizer,
            params,
            overrides,
            converter: ScoreConversionEngine::new(),
        }
    }

    pub fn normalizer(&self) -> &DisciplineNormalizer {
        &self.normalizer
    }

    /// Compute the MCSI for one recorded score.
    ///
    /// `region` and `period` only matter when both are given; together with
    /// the discipline family they select an override rule. A malformed
    /// score is an error, everything else that prevents a value is a
    /// `NotEligible` outcome.
    pub fn compute(
        &self,
        score: Option<f64>,
        discipline_label: &str,
        region: Option<&str>,
        period: Option<i32>,
        raw_shots: Option<&str>,
    ) -> Result<McsiOutcome, ScoreError> {
        let canonical = self.normalizer.normalize(discipline_label);
        let family = self.normalizer.family_of(canonical);

        let Some(params) = self.params.get(family) else {
            return Ok(McsiOutcome::NotEligible(NotEligibleReason::NoParameters(family)));
        };

        let needs_conversion = match (region, period) {
            (Some(region), Some(period)) => {
                self.overrides.requires_conversion(region, period, family)
            }
            _ => false,
        };

        let score = if needs_conversion {
            match self.converter.convert(score, raw_shots)? {
                ConversionOutcome::Converted(c) => {
                    debug!(
                        discipline = canonical,
                        downgraded = c.downgraded,
                        "applied six-ring conversion before MCSI"
                    );
                    c.score
                }
                ConversionOutcome::NotApplicable => {
                    return Ok(McsiOutcome::NotEligible(NotEligibleReason::NoScore));
                }
            }
        } else {
            match score {
                Some(value) => Score::from_decimal(value)?,
                None => return Ok(McsiOutcome::NotEligible(NotEligibleReason::NoScore)),
            }
        };

        let value = round_to(
            score.combined() as f64 * params.multiplier + params.offset,
            2,
        );

        Ok(McsiOutcome::Eligible(McsiValue {
            value,
            canonical: canonical.to_string(),
            family,
            score,
            converted: needs_conversion,
        }))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sporter_engine() -> McsiEngine {
        let mut entries = McsiTable::default_entries();
        entries.push(FamilyParameters {
            family: DisciplineFamily::Sporter,
            multiplier: 2.0,
            offset: 0.0,
        });
        McsiEngine::new(
            DisciplineNormalizer::default(),
            McsiTable::from_entries(&entries).unwrap(),
            OverrideTable::new(vec![OverrideRule {
                region: "QRA".to_string(),
                period: 2024,
                family: DisciplineFamily::Sporter,
                convert: true,
            }]),
        )
    }

    #[test]
    fn test_target_rifle_example() {
        let engine = McsiEngine::default();
        let outcome = engine
            .compute(Some(149.6), "Target Rifle - A", None, None, None)
            .unwrap();

        match outcome {
            McsiOutcome::Eligible(v) => {
                assert_eq!(v.value, 259.5);
                assert_eq!(v.canonical, "TR-A");
                assert_eq!(v.family, DisciplineFamily::TargetRifle);
                assert_eq!(v.score, Score { points: 149, centres: 6 });
                assert!(!v.converted);
            }
            other => panic!("expected eligible, got {other:?}"),
        }
    }

    #[test]
    fn test_family_without_parameters_is_never_eligible() {
        let engine = McsiEngine::default();

        for score in [0.0, 50.5, 149.6, 600.9] {
            for label in ["F Open", "F/TR - FTR", "Sporter - Hunter A", "Muzzle Loader"] {
                let outcome = engine.compute(Some(score), label, None, None, None).unwrap();
                assert!(!outcome.is_eligible(), "{label} {score}");
            }
        }

        assert_eq!(
            engine.compute(Some(10.0), "F Open", None, None, None).unwrap(),
            McsiOutcome::NotEligible(NotEligibleReason::NoParameters(DisciplineFamily::FOpen))
        );
    }

    #[test]
    fn test_missing_score_is_not_eligible() {
        let engine = McsiEngine::default();
        assert_eq!(
            engine.compute(None, "TR-A", None, None, None).unwrap(),
            McsiOutcome::NotEligible(NotEligibleReason::NoScore)
        );
    }

    #[test]
    fn test_override_rule_converts_before_transform() {
        let engine = sporter_engine();

        // 58.4 with two sixes → 56.4 → (56 + 4) × 2
        let outcome = engine
            .compute(Some(58.4), "Sporter - F Class - A", Some("qra"), Some(2024), Some("6X55XX5X46"))
            .unwrap();
        match outcome {
            McsiOutcome::Eligible(v) => {
                assert!(v.converted);
                assert_eq!(v.score, Score { points: 56, centres: 4 });
                assert_eq!(v.value, 120.0);
            }
            other => panic!("expected eligible, got {other:?}"),
        }
    }

    #[test]
    fn test_override_needs_region_and_period() {
        let engine = sporter_engine();

        let other_year = engine
            .compute(Some(58.4), "Sporter-PC", Some("QRA"), Some(2023), Some("6X55XX5X46"))
            .unwrap();
        assert_eq!(other_year.value(), Some(124.0));

        let no_period = engine
            .compute(Some(58.4), "Sporter-PC", Some("QRA"), None, Some("6X55XX5X46"))
            .unwrap();
        assert_eq!(no_period.value(), Some(124.0));
    }

    #[test]
    fn test_override_with_missing_score_is_not_eligible() {
        let engine = sporter_engine();
        let outcome = engine
            .compute(None, "Sporter-PC", Some("QRA"), Some(2024), Some("666"))
            .unwrap();
        assert_eq!(outcome, McsiOutcome::NotEligible(NotEligibleReason::NoScore));
    }

    #[test]
    fn test_ten_centres_propagates_error() {
        let engine = McsiEngine::default();
        assert!(engine.compute(Some(49.97), "TR-B", None, None, None).is_err());
    }

    #[test]
    fn test_rule_with_convert_false_is_ignored() {
        let table = OverrideTable::new(vec![OverrideRule {
            region: "VRA".to_string(),
            period: 2022,
            family: DisciplineFamily::Sporter,
            convert: false,
        }]);
        assert!(!table.requires_conversion("VRA", 2022, DisciplineFamily::Sporter));
        assert!(!table.requires_conversion("QRA", 2022, DisciplineFamily::Sporter));
    }

    #[test]
    fn test_rejects_non_finite_parameters() {
        let entries = vec![FamilyParameters {
            family: DisciplineFamily::FOpen,
            multiplier: f64::NAN,
            offset: 0.0,
        }];
        assert!(McsiTable::from_entries(&entries).is_err());
    }
}
