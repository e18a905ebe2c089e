// 🎯 Discipline Normalizer - free-form labels → canonical codes → families
//
// Result exports label the same discipline many ways ("F Standard - A",
// "F Standard-A"). The normalizer folds them onto one canonical code, and
// every canonical code belongs to exactly one discipline family.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// ============================================================================
// DISCIPLINE FAMILY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DisciplineFamily {
    #[serde(rename = "Target Rifle")]
    TargetRifle,

    #[serde(rename = "F Standard")]
    FStandard,

    #[serde(rename = "F Open")]
    FOpen,

    #[serde(rename = "F/TR")]
    FTr,

    #[serde(rename = "Sporter")]
    Sporter,

    /// Codes outside the fixed partition (unmapped labels fall here)
    #[serde(rename = "Unclassified")]
    Unclassified,
}

impl DisciplineFamily {
    pub fn name(&self) -> &'static str {
        match self {
            DisciplineFamily::TargetRifle => "Target Rifle",
            DisciplineFamily::FStandard => "F Standard",
            DisciplineFamily::FOpen => "F Open",
            DisciplineFamily::FTr => "F/TR",
            DisciplineFamily::Sporter => "Sporter",
            DisciplineFamily::Unclassified => "Unclassified",
        }
    }
}

// ============================================================================
// DISCIPLINE TABLE (configuration data)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyMembers {
    pub family: DisciplineFamily,
    pub codes: Vec<String>,
}

/// Raw label map plus family partition, as loaded from configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisciplineTable {
    pub labels: BTreeMap<String, String>,
    pub families: Vec<FamilyMembers>,
}

impl Default for DisciplineTable {
    fn default() -> Self {
        let labels = [
            // Target Rifle
            ("Target Rifle - A", "TR-A"),
            ("Target Rifle - B", "TR-B"),
            ("Target Rifle - C", "TR-C"),
            ("Target Rifle - C - Tyro", "TR-C"),
            // F Standard
            ("F Standard - A", "F-Std-A"),
            ("F Standard-A", "F-Std-A"),
            ("F Standard - B", "F-Std-B"),
            ("F Standard-B", "F-Std-B"),
            ("Division F Standard Open", "F-Std-Open"),
            // F Open
            ("F Open", "F-Open"),
            ("F Open - FO", "F-Open"),
            ("Division Open", "F-Open"),
            // F/TR
            ("F/TR - FTR", "FTR"),
            // Sporter (Hunter was renamed Sporter Open)
            ("Sporter - Hunter A", "Sporter-Open"),
            ("Sporter - Production Class OPEN - Open", "Sporter-Open"),
            ("Sporter - F Class Open - A", "Sporter-Open"),
            ("Sporter - Production Class - Sporter PC", "Sporter-PC"),
            ("Sporter - F Class - A", "Sporter-PC"),
        ]
        .into_iter()
        .map(|(raw, code)| (raw.to_string(), code.to_string()))
        .collect();

        let family = |family: DisciplineFamily, codes: &[&str]| FamilyMembers {
            family,
            codes: codes.iter().map(|c| c.to_string()).collect(),
        };

        DisciplineTable {
            labels,
            families: vec![
                family(DisciplineFamily::TargetRifle, &["TR-A", "TR-B", "TR-C"]),
                family(DisciplineFamily::FStandard, &["F-Std-A", "F-Std-B", "F-Std-Open"]),
                family(DisciplineFamily::FOpen, &["F-Open"]),
                family(DisciplineFamily::FTr, &["FTR"]),
                family(DisciplineFamily::Sporter, &["Sporter-Open", "Sporter-PC"]),
            ],
        }
    }
}

// ============================================================================
// NORMALIZER
// ============================================================================

#[derive(Debug, Clone)]
pub struct DisciplineNormalizer {
    labels: HashMap<String, String>,
    code_family: HashMap<String, DisciplineFamily>,
    families: Vec<FamilyMembers>,
}

impl DisciplineNormalizer {
    /// Validate a table and build the normalizer.
    ///
    /// Rejects tables where a canonical code is also a raw key that maps
    /// somewhere else, and tables where a canonical code sits in zero or
    /// several families.
    pub fn new(table: DisciplineTable) -> Result<Self, ConfigError> {
        let mut code_family: HashMap<String, DisciplineFamily> = HashMap::new();
        for members in &table.families {
            for code in &members.codes {
                if let Some(existing) = code_family.insert(code.clone(), members.family) {
                    if existing != members.family {
                        return Err(ConfigError::DuplicateFamilyMember {
                            code: code.clone(),
                            first: existing.name().to_string(),
                            second: members.family.name().to_string(),
                        });
                    }
                }
            }
        }

        for code in table.labels.values() {
            if !code_family.contains_key(code) {
                return Err(ConfigError::UnclassifiedCode(code.clone()));
            }
            if let Some(target) = table.labels.get(code) {
                if target != code {
                    return Err(ConfigError::NonIdempotentMapping {
                        code: code.clone(),
                        target: target.clone(),
                    });
                }
            }
        }

        Ok(DisciplineNormalizer::assemble(table, code_family))
    }

    fn assemble(table: DisciplineTable, code_family: HashMap<String, DisciplineFamily>) -> Self {
        DisciplineNormalizer {
            labels: table.labels.into_iter().collect(),
            code_family,
            families: table.families,
        }
    }

    /// Canonical code for a raw label; unknown labels come back unchanged.
    pub fn normalize<'a>(&'a self, raw_label: &'a str) -> &'a str {
        self.labels
            .get(raw_label)
            .map(String::as_str)
            .unwrap_or(raw_label)
    }

    /// Family of a canonical code. Codes outside the partition are
    /// `Unclassified`.
    pub fn family_of(&self, canonical_code: &str) -> DisciplineFamily {
        self.code_family
            .get(canonical_code)
            .copied()
            .unwrap_or(DisciplineFamily::Unclassified)
    }

    /// Shortcut: raw label straight to its family
    pub fn family_of_label(&self, raw_label: &str) -> DisciplineFamily {
        self.family_of(self.normalize(raw_label))
    }

    /// Canonical codes in one family, in configured order
    pub fn codes_in(&self, family: DisciplineFamily) -> &[String] {
        self.families
            .iter()
            .find(|m| m.family == family)
            .map(|m| m.codes.as_slice())
            .unwrap_or(&[])
    }
}

impl Default for DisciplineNormalizer {
    /// Built-in historical table (validated by the tests below)
    fn default() -> Self {
        let table = DisciplineTable::default();
        let code_family = table
            .families
            .iter()
            .flat_map(|m| m.codes.iter().map(move |c| (c.clone(), m.family)))
            .collect();
        DisciplineNormalizer::assemble(table, code_family)
    }
}

// ============================================================================
// TESTS
// ============================================================================
