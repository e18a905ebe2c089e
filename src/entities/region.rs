// 🗺️ Region & Competition Entities
//
// A competition is one region's championship in one year, labelled in
// exports as "<REGION> <YEAR>" (sometimes with a suffix: "NRAA 2023 FOS").
// An unknown region code is fatal for an import batch.

use crate::error::ImportError;
use serde::{Deserialize, Serialize};

// ============================================================================
// REGION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub code: String,
    pub name: String,
}

impl Region {
    pub fn new(code: &str, name: &str) -> Self {
        Region {
            code: code.to_string(),
            name: name.to_string(),
        }
    }
}

/// Known region codes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionRegistry {
    regions: Vec<Region>,
}

impl RegionRegistry {
    pub fn new(regions: Vec<Region>) -> Self {
        RegionRegistry { regions }
    }

    pub fn default_regions() -> Vec<Region> {
        vec![
            Region::new("NRAA", "National Rifle Association of Australia"),
            Region::new("ACTRA", "Australian Capital Territory"),
            Region::new("NSWRA", "New South Wales"),
            Region::new("NTRA", "Northern Territory"),
            Region::new("QRA", "Queensland"),
            Region::new("SARA", "South Australia"),
            Region::new("TRA", "Tasmania"),
            Region::new("VRA", "Victoria"),
            Region::new("WARA", "Western Australia"),
        ]
    }

    pub fn get(&self, code: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.code == code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    pub fn all(&self) -> &[Region] {
        &self.regions
    }

    /// Parse a competition label and check its region is known
    pub fn resolve_competition(&self, label: &str) -> Result<CompetitionKey, ImportError> {
        let key = parse_competition_label(label)?;
        if !self.contains(&key.region) {
            return Err(ImportError::UnknownRegion {
                label: label.to_string(),
                code: key.region,
            });
        }
        Ok(key)
    }
}

impl Default for RegionRegistry {
    fn default() -> Self {
        RegionRegistry::new(Self::default_regions())
    }
}

// ============================================================================
// COMPETITION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompetitionKey {
    pub region: String,
    pub year: i32,
}

impl CompetitionKey {
    pub fn new(region: &str, year: i32) -> Self {
        CompetitionKey {
            region: region.to_string(),
            year,
        }
    }

    pub fn name(&self) -> String {
        format!("{} {}", self.region, self.year)
    }
}

/// "QRA 2025" → (QRA, 2025). Tokens after the year are ignored.
pub fn parse_competition_label(label: &str) -> Result<CompetitionKey, ImportError> {
    let mut parts = label.split_whitespace();

    let region = parts
        .next()
        .ok_or_else(|| ImportError::MalformedCompetitionLabel(label.to_string()))?;
    let year = parts
        .next()
        .and_then(|y| y.parse::<i32>().ok())
        .ok_or_else(|| ImportError::MalformedCompetitionLabel(label.to_string()))?;

    Ok(CompetitionKey::new(region, year))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_competition_label() {
        assert_eq!(
            parse_competition_label("QRA 2025").unwrap(),
            CompetitionKey::new("QRA", 2025)
        );
        assert_eq!(
            parse_competition_label("NRAA 2023 FOS").unwrap(),
            CompetitionKey::new("NRAA", 2023)
        );
        assert_eq!(
            parse_competition_label("  VRA   2019 ").unwrap(),
            CompetitionKey::new("VRA", 2019)
        );
    }

    #[test]
    fn test_parse_competition_label_without_year() {
        assert!(matches!(
            parse_competition_label("QRA"),
            Err(ImportError::MalformedCompetitionLabel(_))
        ));
        assert!(matches!(
            parse_competition_label("QRA Queens"),
            Err(ImportError::MalformedCompetitionLabel(_))
        ));
        assert!(parse_competition_label("").is_err());
    }

    #[test]
    fn test_resolve_competition_unknown_region() {
        let registry = RegionRegistry::default();

        assert!(registry.resolve_competition("QRA 2025").is_ok());
        match registry.resolve_competition("XYZ 2025") {
            Err(ImportError::UnknownRegion { code, label }) => {
                assert_eq!(code, "XYZ");
                assert_eq!(label, "XYZ 2025");
            }
            other => panic!("expected unknown region, got {other:?}"),
        }
    }

    #[test]
    fn test_competition_name() {
        assert_eq!(CompetitionKey::new("SARA", 2021).name(), "SARA 2021");
    }
}
