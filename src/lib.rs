// Rifle Results - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod config;
pub mod conversion;     // Six-ring → standard target rescaling
pub mod db;
pub mod disciplines;    // Label normalization + family partition
pub mod entities;
pub mod error;
pub mod identity;       // Two-tier shooter resolution
pub mod import;
pub mod mcsi;           // Mixed Category Score Index
pub mod ranking;
pub mod reports;
pub mod score;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use config::{AppConfig, ReportSettings};
pub use conversion::{ConversionOutcome, ConvertedScore, ScoreConversionEngine, TargetScale};
pub use db::{
    commit_batch, database_stats, insert_registry, load_registry, load_regions,
    load_shooter, load_shots_for_shooter, load_stored_results, seed_regions,
    setup_database, CommitOutcome, DatabaseStats, StoredResult,
};
pub use disciplines::{DisciplineFamily, DisciplineNormalizer, DisciplineTable};
pub use entities::{CompetitionKey, Region, RegionRegistry, ShooterRegistryEntry, Sid};
pub use error::{ConfigError, ImportError, ScoreError};
pub use identity::{IdentityIndex, Resolution};
pub use import::{ImportBatch, ImportContext, QualityIssue, RawResultRow, ScoredEntity};
pub use mcsi::{McsiEngine, McsiOutcome, McsiTable, OverrideRule, OverrideTable};
pub use ranking::{
    discipline_leaderboards, event_ranking, mcsi_leaderboard, rank, rank_by, GroupStats,
    RankOptions, Ranked,
};
pub use score::{Score, ShotRecord};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
