// 🧑 Shooter Entity - registry snapshot keyed by sid
//
// "Names are VALUES (people get nicknames, change clubs), sid is IDENTITY"
//
// The registry is read once per import run and never mutated by the
// results pipeline.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

/// Stable shooter identifier issued by the national registry
pub type Sid = i64;

// ============================================================================
// REGISTRY ENTRY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShooterRegistryEntry {
    pub sid: Sid,
    pub first_name: String,
    pub last_name: String,
    pub preferred_name: Option<String>,
    pub club_name: Option<String>,
}

impl ShooterRegistryEntry {
    pub fn new(sid: Sid, first_name: &str, last_name: &str) -> Self {
        ShooterRegistryEntry {
            sid,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            preferred_name: None,
            club_name: None,
        }
    }

    /// Builder pattern: add preferred name
    pub fn with_preferred_name(mut self, preferred: &str) -> Self {
        self.preferred_name = Some(preferred.to_string());
        self
    }

    /// Builder pattern: add club
    pub fn with_club(mut self, club: &str) -> Self {
        self.club_name = Some(club.to_string());
        self
    }

    /// Name as it should be displayed (preferred name wins)
    pub fn display_name(&self) -> String {
        let first = self
            .preferred_name
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(&self.first_name);
        format!("{} {}", first, self.last_name)
    }
}

// ============================================================================
// CSV LOADING
// ============================================================================

/// Row layout of the national registry export
#[derive(Debug, Deserialize)]
struct RegistryRow {
    #[serde(rename = "SID")]
    sid: Sid,

    #[serde(rename = "Last Name")]
    last_name: String,

    #[serde(rename = "First Name")]
    first_name: String,

    #[serde(rename = "Pref Name", default)]
    pref_name: String,

    #[serde(rename = "Club", default)]
    club: String,
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

impl From<RegistryRow> for ShooterRegistryEntry {
    fn from(row: RegistryRow) -> Self {
        ShooterRegistryEntry {
            sid: row.sid,
            first_name: row.first_name,
            last_name: row.last_name,
            preferred_name: non_empty(row.pref_name),
            club_name: non_empty(row.club),
        }
    }
}

/// Read registry entries in file order
pub fn read_registry<R: Read>(reader: R) -> Result<Vec<ShooterRegistryEntry>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut entries = Vec::new();

    for (i, result) in rdr.deserialize::<RegistryRow>().enumerate() {
        let row = result.with_context(|| format!("Failed to parse registry row {}", i + 1))?;
        entries.push(row.into());
    }

    Ok(entries)
}

pub fn load_registry_csv(path: &Path) -> Result<Vec<ShooterRegistryEntry>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open registry CSV: {:?}", path))?;
    read_registry(file)
}

// ============================================================================
// TESTS
// ============================================================================
