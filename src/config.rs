// ⚙️ Configuration - lookup tables and runtime settings
//
// Every table the pipeline reads (discipline labels, family partition,
// MCSI parameters, override rules, regions) has a built-in default and can
// be replaced section by section from a JSON file. Runtime locations come
// from the environment (a .env file is honoured).

use crate::disciplines::{DisciplineNormalizer, DisciplineTable};
use crate::entities::region::{Region, RegionRegistry};
use crate::error::ConfigError;
use crate::mcsi::{FamilyParameters, McsiEngine, McsiTable, OverrideRule, OverrideTable};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const ENV_DB: &str = "RIFLE_RESULTS_DB";
pub const ENV_CONFIG: &str = "RIFLE_RESULTS_CONFIG";
pub const ENV_ADDR: &str = "RIFLE_RESULTS_ADDR";

pub const DEFAULT_DB: &str = "results.db";
pub const DEFAULT_ADDR: &str = "0.0.0.0:5001";

// ============================================================================
// REPORT DEFAULTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// MCSI leaderboard: results a shooter needs to be listed
    pub min_sample: usize,

    /// MCSI leaderboard: best N results averaged
    pub top_k: usize,

    /// Top shooters report: Grand aggregate entries needed to be listed
    pub top_shooters_min_entries: usize,
    pub top_shooters_limit: usize,
}

impl Default for ReportSettings {
    fn default() -> Self {
        ReportSettings {
            min_sample: 5,
            top_k: 5,
            top_shooters_min_entries: 3,
            top_shooters_limit: 50,
        }
    }
}

// ============================================================================
// APP CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub disciplines: DisciplineTable,
    pub mcsi: Vec<FamilyParameters>,
    pub overrides: Vec<OverrideRule>,
    pub regions: Vec<Region>,
    pub reports: ReportSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            disciplines: DisciplineTable::default(),
            mcsi: McsiTable::default_entries(),
            overrides: Vec::new(),
            regions: RegionRegistry::default_regions(),
            reports: ReportSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load from a JSON file. Missing sections keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Read {
            path: path.as_ref().display().to_string(),
            source,
        })?;
        let config = Self::from_json_str(&content)?;
        info!("Loaded configuration from {:?}", path.as_ref());
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// `$RIFLE_RESULTS_CONFIG` if set, otherwise the built-in defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(ENV_CONFIG) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path),
            _ => Ok(Self::default()),
        }
    }

    /// Check every table without keeping the built objects
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.normalizer()?;
        McsiTable::from_entries(&self.mcsi)?;
        Ok(())
    }

    pub fn normalizer(&self) -> Result<DisciplineNormalizer, ConfigError> {
        DisciplineNormalizer::new(self.disciplines.clone())
    }

    pub fn mcsi_engine(&self) -> Result<McsiEngine, ConfigError> {
        Ok(McsiEngine::new(
            self.normalizer()?,
            McsiTable::from_entries(&self.mcsi)?,
            OverrideTable::new(self.overrides.clone()),
        ))
    }

    pub fn region_registry(&self) -> RegionRegistry {
        RegionRegistry::new(self.regions.clone())
    }
}

/// Database path from `$RIFLE_RESULTS_DB`
pub fn database_path() -> PathBuf {
    std::env::var(ENV_DB)
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB))
}

/// Server bind address from `$RIFLE_RESULTS_ADDR`
pub fn server_addr() -> String {
    std::env::var(ENV_ADDR)
        .ok()
        .filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ADDR.to_string())
}

/// Load a `.env` file from the working directory if one exists
pub fn load_dotenv() {
    if let Ok(path) = dotenvy::dotenv() {
        info!("Loaded environment from {:?}", path);
    }
}

// ============================================================================
// TESTS
// ============================================================================
