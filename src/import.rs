// 📥 Results Import - raw CSV rows → canonical batch
//
// One source file becomes one all-or-nothing batch:
//
//   1. every competition label is resolved against the region registry
//      (an unknown region aborts the whole batch before anything else)
//   2. each row's shooter is resolved through the IdentityIndex
//   3. resolved rows become Aggregate or String results, unresolved rows
//      are diverted verbatim to the unmatched list
//
// Malformed optional numbers (place, score, distance...) are treated as
// absent and reported as data-quality issues, never as errors.

use crate::disciplines::DisciplineNormalizer;
use crate::entities::region::{CompetitionKey, RegionRegistry};
use crate::entities::shooter::Sid;
use crate::error::ImportError;
use crate::identity::{IdentityIndex, Resolution};
use crate::score::{check_coupling, parse_shots, Score, ShotRecord};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

// ============================================================================
// RAW ROW
// ============================================================================

/// One record of a results export, exactly as it appears in the file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawResultRow {
    pub competition: String,
    pub match_number: String,
    pub match_name: String,
    pub distance: String,
    pub distance_unit: String,
    pub discipline: String,
    pub place: String,
    pub full_name: String,
    pub last_name: String,
    pub first_name: String,
    pub club: String,
    pub state: String,
    pub shots: String,
    pub info: String,
    pub score: String,
}

impl RawResultRow {
    pub fn is_aggregate(&self) -> bool {
        self.match_name.contains("Aggregate")
    }
}

/// Read rows in file order
pub fn read_results<R: Read>(reader: R) -> Result<Vec<RawResultRow>, ImportError> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        rows.push(result?);
    }
    Ok(rows)
}

// ============================================================================
// DATA QUALITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QualityIssueKind {
    /// A non-empty optional number that did not parse
    MalformedNumber,

    /// A score that cannot be split into points.centres
    MalformedScore,

    /// Centre markers in the shots disagree with the score's fraction
    CentreMismatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityIssue {
    /// 1-based data row in the source file
    pub row: usize,
    pub field: String,
    pub kind: QualityIssueKind,
    pub message: String,
}

struct RowContext<'a> {
    row: usize,
    issues: &'a mut Vec<QualityIssue>,
}

impl RowContext<'_> {
    fn report(&mut self, field: &str, kind: QualityIssueKind, message: String) {
        warn!(row = self.row, field, "{}", message);
        self.issues.push(QualityIssue {
            row: self.row,
            field: field.to_string(),
            kind,
            message,
        });
    }

    /// Empty → None silently; unparseable → None with a warning
    fn optional_int(&mut self, field: &str, raw: &str) -> Option<i64> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        match trimmed.parse::<i64>() {
            Ok(v) => Some(v),
            Err(_) => {
                self.report(
                    field,
                    QualityIssueKind::MalformedNumber,
                    format!("'{}' is not a whole number, treated as absent", trimmed),
                );
                None
            }
        }
    }

    fn optional_score(&mut self, raw: &str) -> Option<f64> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => Some(v),
            _ => {
                self.report(
                    "score",
                    QualityIssueKind::MalformedNumber,
                    format!("'{}' is not a number, treated as absent", trimmed),
                );
                None
            }
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ============================================================================
// CANONICAL RECORDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultKind {
    Aggregate,
    String,
}

/// A resolved result. Score and shots travel together and are never
/// updated independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredEntity {
    pub kind: ResultKind,
    pub competition: CompetitionKey,
    pub match_number: Option<i64>,
    pub match_name: String,
    pub distance: Option<i64>,
    pub distance_unit: Option<String>,
    pub discipline_raw: String,
    pub discipline: String,
    pub place: Option<i64>,
    pub sid: Sid,
    pub state: Option<String>,
    pub info: Option<String>,
    pub score: Option<f64>,
    pub shots_raw: Option<String>,

    /// Empty for aggregates and for strings without a shot record
    pub shots: Vec<ShotRecord>,
}

/// A row whose shooter could not be identified, kept verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnmatchedResultRecord {
    pub row: usize,
    pub is_aggregate: bool,
    pub raw: RawResultRow,
}

// ============================================================================
// BATCH
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportBatch {
    pub source_file: String,

    /// SHA-256 of the source bytes; identical files import once
    pub checksum: String,
    pub competitions: Vec<CompetitionKey>,
    pub aggregates: Vec<ScoredEntity>,
    pub strings: Vec<ScoredEntity>,
    pub unmatched: Vec<UnmatchedResultRecord>,
    pub issues: Vec<QualityIssue>,
}

impl ImportBatch {
    pub fn shot_count(&self) -> usize {
        self.strings.iter().map(|s| s.shots.len()).sum()
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: {} competitions, {} aggregates, {} strings ({} shots), {} unmatched, {} quality issues",
            self.source_file,
            self.competitions.len(),
            self.aggregates.len(),
            self.strings.len(),
            self.shot_count(),
            self.unmatched.len(),
            self.issues.len()
        )
    }
}

pub fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Everything a batch build reads; all of it is immutable for the run
pub struct ImportContext<'a> {
    pub index: &'a IdentityIndex,
    pub regions: &'a RegionRegistry,
    pub normalizer: &'a DisciplineNormalizer,
}

impl ImportContext<'_> {
    /// Build a batch from a source file's raw bytes
    pub fn build_from_bytes(&self, source_file: &str, bytes: &[u8]) -> Result<ImportBatch, ImportError> {
        let rows = read_results(bytes)?;
        self.build(source_file, checksum(bytes), rows)
    }

    pub fn build_from_path(&self, path: &Path) -> Result<ImportBatch, ImportError> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.build_from_bytes(&name, &bytes)
    }

    /// Build the in-memory batch. Fails only on competition labels; shooter
    /// misses and bad optional numbers are absorbed into the batch.
    pub fn build(
        &self,
        source_file: &str,
        checksum: String,
        rows: Vec<RawResultRow>,
    ) -> Result<ImportBatch, ImportError> {
        let mut competitions: BTreeMap<String, CompetitionKey> = BTreeMap::new();
        for row in &rows {
            if !competitions.contains_key(&row.competition) {
                let key = self.regions.resolve_competition(&row.competition)?;
                competitions.insert(row.competition.clone(), key);
            }
        }

        let mut batch = ImportBatch {
            source_file: source_file.to_string(),
            checksum,
            competitions: Vec::new(),
            aggregates: Vec::new(),
            strings: Vec::new(),
            unmatched: Vec::new(),
            issues: Vec::new(),
        };

        for (i, row) in rows.into_iter().enumerate() {
            let row_number = i + 1;
            let resolution = self.index.resolve(&row.first_name, &row.last_name, &row.club);

            let sid = match resolution {
                Resolution::Strong(sid) | Resolution::Weak(sid) => sid,
                Resolution::Unresolved => {
                    batch.unmatched.push(UnmatchedResultRecord {
                        row: row_number,
                        is_aggregate: row.is_aggregate(),
                        raw: row,
                    });
                    continue;
                }
            };

            let competition = competitions[&row.competition].clone();
            let mut ctx = RowContext {
                row: row_number,
                issues: &mut batch.issues,
            };
            let entity = self.to_entity(&mut ctx, row, competition, sid);

            match entity.kind {
                ResultKind::Aggregate => batch.aggregates.push(entity),
                ResultKind::String => batch.strings.push(entity),
            }
        }

        let mut keys: Vec<CompetitionKey> = competitions.into_values().collect();
        keys.sort();
        keys.dedup();
        batch.competitions = keys;

        info!("{}", batch.summary());
        Ok(batch)
    }

    fn to_entity(
        &self,
        ctx: &mut RowContext<'_>,
        row: RawResultRow,
        competition: CompetitionKey,
        sid: Sid,
    ) -> ScoredEntity {
        let kind = if row.is_aggregate() {
            ResultKind::Aggregate
        } else {
            ResultKind::String
        };

        let score = ctx.optional_score(&row.score);
        let shots_raw = non_empty(&row.shots);
        let shots = match (kind, &shots_raw) {
            (ResultKind::String, Some(raw)) => parse_shots(raw),
            _ => Vec::new(),
        };

        if let Some(value) = score {
            match Score::from_decimal(value) {
                Ok(parsed) => {
                    if let Err(mismatch) = check_coupling(&parsed, &shots) {
                        ctx.report(
                            "shots",
                            QualityIssueKind::CentreMismatch,
                            format!(
                                "score {} encodes {} centres but shots contain {}",
                                value, mismatch.encoded_centres, mismatch.counted_centres
                            ),
                        );
                    }
                }
                Err(e) => ctx.report("score", QualityIssueKind::MalformedScore, e.to_string()),
            }
        }

        let place = ctx.optional_int("place", &row.place);
        let match_number = ctx.optional_int("match_number", &row.match_number);
        let distance = match kind {
            ResultKind::String => ctx.optional_int("distance", &row.distance),
            ResultKind::Aggregate => None,
        };

        ScoredEntity {
            kind,
            competition,
            match_number,
            distance,
            distance_unit: non_empty(&row.distance_unit),
            discipline: self.normalizer.normalize(&row.discipline).to_string(),
            discipline_raw: row.discipline,
            place,
            sid,
            state: non_empty(&row.state),
            info: non_empty(&row.info),
            score,
            shots_raw,
            shots,
            match_name: row.match_name,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::shooter::ShooterRegistryEntry;

    const HEADER: &str = "competition,match_number,match_name,distance,distance_unit,discipline,place,full_name,last_name,first_name,club,state,shots,info,score\n";

    fn index() -> IdentityIndex {
        IdentityIndex::build(&[
            ShooterRegistryEntry::new(7, "John", "Smith").with_club("ABC Rifle Club"),
            ShooterRegistryEntry::new(12, "Robert", "Brown")
                .with_preferred_name("Bob")
                .with_club("Belmont"),
        ])
    }

    fn build(csv: &str) -> Result<ImportBatch, ImportError> {
        let index = index();
        let regions = RegionRegistry::default();
        let normalizer = DisciplineNormalizer::default();
        let ctx = ImportContext {
            index: &index,
            regions: &regions,
            normalizer: &normalizer,
        };
        ctx.build_from_bytes("results.csv", format!("{HEADER}{csv}").as_bytes())
    }

    #[test]
    fn test_rows_split_into_aggregates_strings_and_unmatched() {
        let batch = build(
            "\
QRA 2025,1,Queens Prize Aggregate,,,Target Rifle - A,1,John Smith,Smith,John,ABC Rifle Club,QLD,,,149.6
QRA 2025,1,Queens Prize 1,300,m,Target Rifle - A,2,Bob Brown,Brown,Bob,Belmont,QLD,V5V4VV5V55,,48.5
QRA 2025,1,Queens Prize 1,300,m,Target Rifle - A,3,Jane Doe,Doe,Jane,Nowhere,QLD,5555,,20.0
",
        )
        .unwrap();

        assert_eq!(batch.competitions, vec![CompetitionKey::new("QRA", 2025)]);
        assert_eq!(batch.aggregates.len(), 1);
        assert_eq!(batch.strings.len(), 1);
        assert_eq!(batch.unmatched.len(), 1);

        let agg = &batch.aggregates[0];
        assert_eq!(agg.sid, 7);
        assert_eq!(agg.discipline, "TR-A");
        assert_eq!(agg.discipline_raw, "Target Rifle - A");
        assert_eq!(agg.score, Some(149.6));
        assert!(agg.shots.is_empty());

        let string = &batch.strings[0];
        assert_eq!(string.sid, 12);
        assert_eq!(string.distance, Some(300));
        assert_eq!(string.shots.len(), 10);
        assert_eq!(string.shots[1].value, '5');

        let unmatched = &batch.unmatched[0];
        assert_eq!(unmatched.row, 3);
        assert!(!unmatched.is_aggregate);
        assert_eq!(unmatched.raw.first_name, "Jane");
        assert!(batch.issues.is_empty());
    }

    #[test]
    fn test_unmatched_row_appears_nowhere_else() {
        let batch = build(
            "QRA 2025,2,Grand Aggregate,,,F Open,5,Nobody Known,Known,Nobody,None,QLD,,,400.20\n",
        )
        .unwrap();

        assert!(batch.aggregates.is_empty());
        assert!(batch.strings.is_empty());
        assert_eq!(batch.unmatched.len(), 1);
        assert!(batch.unmatched[0].is_aggregate);
    }

    #[test]
    fn test_unknown_region_aborts_batch() {
        let result = build(
            "\
QRA 2025,1,Grand Aggregate,,,F Open,1,John Smith,Smith,John,ABC Rifle Club,QLD,,,400.2
XYZ 2025,1,Grand Aggregate,,,F Open,1,John Smith,Smith,John,ABC Rifle Club,QLD,,,400.2
",
        );

        assert!(matches!(result, Err(ImportError::UnknownRegion { .. })));
    }

    #[test]
    fn test_missing_year_aborts_batch() {
        let result = build("QRA,1,Grand Aggregate,,,F Open,1,John Smith,Smith,John,ABC Rifle Club,QLD,,,400.2\n");
        assert!(matches!(result, Err(ImportError::MalformedCompetitionLabel(_))));
    }

    #[test]
    fn test_malformed_optional_numbers_become_absent() {
        let batch = build(
            "QRA 2025,x,Queens 1,far,m,TR-A,DNF,John Smith,Smith,John,ABC Rifle Club,QLD,,,\n",
        )
        .unwrap();

        let string = &batch.strings[0];
        assert_eq!(string.place, None);
        assert_eq!(string.distance, None);
        assert_eq!(string.match_number, None);
        assert_eq!(string.score, None);

        let fields: Vec<&str> = batch.issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(fields, vec!["place", "match_number", "distance"]);
        assert!(batch
            .issues
            .iter()
            .all(|i| i.kind == QualityIssueKind::MalformedNumber));
    }

    #[test]
    fn test_centre_mismatch_is_reported_not_fatal() {
        let batch = build(
            "QRA 2025,1,Queens 1,300,m,TR-A,1,John Smith,Smith,John,ABC Rifle Club,QLD,VVV55,,25.1\n",
        )
        .unwrap();

        assert_eq!(batch.strings.len(), 1);
        assert_eq!(batch.issues.len(), 1);
        assert_eq!(batch.issues[0].kind, QualityIssueKind::CentreMismatch);
    }

    #[test]
    fn test_checksum_is_stable() {
        assert_eq!(checksum(b"abc"), checksum(b"abc"));
        assert_ne!(checksum(b"abc"), checksum(b"abd"));
        assert_eq!(checksum(b"").len(), 64);
    }
}
