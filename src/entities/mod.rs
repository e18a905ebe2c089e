// Entity Models
//
// A shooter's sid is identity; names and clubs are values that change.
// Regions are fixed reference data that competitions hang off.

pub mod region;
pub mod shooter;

pub use region::{parse_competition_label, CompetitionKey, Region, RegionRegistry};
pub use shooter::{load_registry_csv, read_registry, ShooterRegistryEntry, Sid};
