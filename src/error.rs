// ⚠️ Error Types - what can stop a batch, what can't
//
// Only conditions that must abort work live here. Unresolved shooters,
// non-eligible disciplines and inapplicable conversions are ordinary
// outcomes and are modelled as enum variants in their own modules.

use thiserror::Error;

/// Failures that abort an entire import batch.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("unknown region code '{code}' in competition '{label}'")]
    UnknownRegion { label: String, code: String },

    #[error("malformed competition label '{0}': expected '<REGION> <YEAR>'")]
    MalformedCompetitionLabel(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A score value that cannot be represented in the points.centres encoding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreError {
    #[error("score {0} is negative or not a finite number")]
    InvalidValue(f64),

    #[error("score {score} encodes {centres} centres; at most 9 fit in one decimal place")]
    CentresOutOfRange { score: f64, centres: u32 },
}

/// Invalid lookup tables or an unreadable configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("discipline map is not idempotent: canonical code '{code}' maps to '{target}'")]
    NonIdempotentMapping { code: String, target: String },

    #[error("canonical code '{0}' is not a member of any discipline family")]
    UnclassifiedCode(String),

    #[error("canonical code '{code}' appears in both '{first}' and '{second}'")]
    DuplicateFamilyMember {
        code: String,
        first: String,
        second: String,
    },

    #[error("MCSI parameters for '{0}' are not finite numbers")]
    InvalidParameters(String),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_failure_is_a_serialize_error() {
        fn encode(raw: &str) -> Result<serde_json::Value, ImportError> {
            Ok(serde_json::from_str(raw)?)
        }

        let err = encode("{not json").unwrap_err();
        assert!(matches!(err, ImportError::Serialize(_)));
        assert!(err.to_string().starts_with("serialization error"));
    }
}
