// 🗄️ Results Store - SQLite persistence
//
// Reference tables (regions, clubs, shooters) are loaded once from the
// registry. Result tables are only ever written through `commit_batch`,
// one transaction per source file, so a failed import leaves nothing behind.

use crate::entities::region::{CompetitionKey, Region, RegionRegistry};
use crate::entities::shooter::{ShooterRegistryEntry, Sid};
use crate::error::ImportError;
use crate::import::{ImportBatch, ResultKind, ScoredEntity};
use crate::score::ShotRecord;
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database: {:?}", path))?;
    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS regions (
            code TEXT PRIMARY KEY,
            name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS clubs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE NOT NULL
        );

        CREATE TABLE IF NOT EXISTS shooters (
            sid INTEGER PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            preferred_name TEXT,
            club_id INTEGER REFERENCES clubs(id)
        );

        CREATE TABLE IF NOT EXISTS import_batches (
            batch_id TEXT PRIMARY KEY,
            source_file TEXT NOT NULL,
            checksum TEXT UNIQUE NOT NULL,
            imported_at TEXT NOT NULL,
            aggregates INTEGER NOT NULL,
            strings INTEGER NOT NULL,
            unmatched INTEGER NOT NULL,
            quality_issues INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS competitions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            region TEXT NOT NULL REFERENCES regions(code),
            year INTEGER NOT NULL,
            UNIQUE(region, year)
        );

        CREATE TABLE IF NOT EXISTS aggregates (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id TEXT NOT NULL REFERENCES import_batches(batch_id),
            competition_id INTEGER NOT NULL REFERENCES competitions(id),
            match_number INTEGER,
            match_name TEXT NOT NULL,
            discipline_raw TEXT NOT NULL,
            discipline TEXT NOT NULL,
            place INTEGER,
            sid INTEGER NOT NULL,
            state TEXT,
            info TEXT,
            score REAL
        );

        CREATE TABLE IF NOT EXISTS strings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id TEXT NOT NULL REFERENCES import_batches(batch_id),
            competition_id INTEGER NOT NULL REFERENCES competitions(id),
            match_number INTEGER,
            match_name TEXT NOT NULL,
            distance INTEGER,
            distance_unit TEXT,
            discipline_raw TEXT NOT NULL,
            discipline TEXT NOT NULL,
            place INTEGER,
            sid INTEGER NOT NULL,
            state TEXT,
            info TEXT,
            score REAL,
            shots_raw TEXT
        );

        CREATE TABLE IF NOT EXISTS shots (
            string_id INTEGER NOT NULL REFERENCES strings(id),
            shot_number INTEGER NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY (string_id, shot_number)
        );

        CREATE TABLE IF NOT EXISTS unmatched_results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id TEXT NOT NULL REFERENCES import_batches(batch_id),
            row_number INTEGER NOT NULL,
            is_aggregate INTEGER NOT NULL,
            competition TEXT NOT NULL,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            club TEXT NOT NULL,
            raw TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_aggregates_sid ON aggregates(sid);
        CREATE INDEX IF NOT EXISTS idx_aggregates_competition ON aggregates(competition_id);
        CREATE INDEX IF NOT EXISTS idx_strings_sid ON strings(sid);
        CREATE INDEX IF NOT EXISTS idx_strings_competition ON strings(competition_id);",
    )?;

    Ok(())
}

// ============================================================================
// REFERENCE DATA
// ============================================================================

pub fn seed_regions(conn: &Connection, registry: &RegionRegistry) -> Result<usize> {
    let mut inserted = 0;
    for region in registry.all() {
        inserted += conn.execute(
            "INSERT OR IGNORE INTO regions (code, name) VALUES (?1, ?2)",
            params![region.code, region.name],
        )?;
    }
    Ok(inserted)
}

pub fn load_regions(conn: &Connection) -> Result<RegionRegistry> {
    let mut stmt = conn.prepare("SELECT code, name FROM regions ORDER BY code")?;
    let regions = stmt
        .query_map([], |row| {
            Ok(Region {
                code: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RegionRegistry::new(regions))
}

/// Upsert registry entries; clubs are created on first sight
pub fn insert_registry(conn: &mut Connection, entries: &[ShooterRegistryEntry]) -> Result<usize> {
    let tx = conn.transaction()?;
    for entry in entries {
        let club_id = match entry.club_name.as_deref() {
            Some(club) => Some(club_id(&tx, club)?),
            None => None,
        };
        tx.execute(
            "INSERT OR REPLACE INTO shooters (sid, first_name, last_name, preferred_name, club_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.sid,
                entry.first_name,
                entry.last_name,
                entry.preferred_name,
                club_id
            ],
        )?;
    }
    tx.commit()?;

    info!("Stored {} registry entries", entries.len());
    Ok(entries.len())
}

fn club_id(tx: &Transaction<'_>, name: &str) -> rusqlite::Result<i64> {
    tx.execute("INSERT OR IGNORE INTO clubs (name) VALUES (?1)", params![name])?;
    tx.query_row("SELECT id FROM clubs WHERE name = ?1", params![name], |row| row.get(0))
}

const SHOOTER_SELECT: &str = "SELECT s.sid, s.first_name, s.last_name, s.preferred_name, c.name
     FROM shooters s LEFT JOIN clubs c ON c.id = s.club_id";

fn shooter_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ShooterRegistryEntry> {
    Ok(ShooterRegistryEntry {
        sid: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        preferred_name: row.get(3)?,
        club_name: row.get(4)?,
    })
}

/// Registry snapshot, ordered by sid so index builds are reproducible
pub fn load_registry(conn: &Connection) -> Result<Vec<ShooterRegistryEntry>> {
    let mut stmt = conn.prepare(&format!("{SHOOTER_SELECT} ORDER BY s.sid"))?;
    let entries = stmt
        .query_map([], shooter_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

pub fn load_shooter(conn: &Connection, sid: Sid) -> Result<Option<ShooterRegistryEntry>> {
    let entry = conn
        .query_row(
            &format!("{SHOOTER_SELECT} WHERE s.sid = ?1"),
            params![sid],
            shooter_from_row,
        )
        .optional()?;
    Ok(entry)
}

// ============================================================================
// BATCH COMMIT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitOutcome {
    Committed { batch_id: String },

    /// A batch with the same checksum was already stored
    AlreadyImported { batch_id: String },
}

pub fn find_batch_by_checksum(conn: &Connection, checksum: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT batch_id FROM import_batches WHERE checksum = ?1",
        params![checksum],
        |row| row.get(0),
    )
    .optional()
}

/// Persist one batch atomically. Any failure rolls the whole batch back.
pub fn commit_batch(conn: &mut Connection, batch: &ImportBatch) -> Result<CommitOutcome, ImportError> {
    if let Some(batch_id) = find_batch_by_checksum(conn, &batch.checksum)? {
        warn!(
            "{} already imported as batch {}, skipping",
            batch.source_file, batch_id
        );
        return Ok(CommitOutcome::AlreadyImported { batch_id });
    }

    let batch_id = uuid::Uuid::new_v4().to_string();
    let tx = conn.transaction()?;

    tx.execute(
        "INSERT INTO import_batches
            (batch_id, source_file, checksum, imported_at, aggregates, strings, unmatched, quality_issues)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            batch_id,
            batch.source_file,
            batch.checksum,
            Utc::now().to_rfc3339(),
            batch.aggregates.len() as i64,
            batch.strings.len() as i64,
            batch.unmatched.len() as i64,
            batch.issues.len() as i64,
        ],
    )?;

    for entity in batch.aggregates.iter().chain(&batch.strings) {
        let competition_id = competition_id(&tx, &entity.competition)?;
        match entity.kind {
            ResultKind::Aggregate => insert_aggregate(&tx, &batch_id, competition_id, entity)?,
            ResultKind::String => insert_string(&tx, &batch_id, competition_id, entity)?,
        }
    }

    for record in &batch.unmatched {
        let raw = serde_json::to_string(&record.raw)?;
        tx.execute(
            "INSERT INTO unmatched_results
                (batch_id, row_number, is_aggregate, competition, first_name, last_name, club, raw)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                batch_id,
                record.row as i64,
                record.is_aggregate,
                record.raw.competition,
                record.raw.first_name,
                record.raw.last_name,
                record.raw.club,
                raw,
            ],
        )?;
    }

    tx.commit()?;

    info!("Committed batch {} ({})", batch_id, batch.summary());
    Ok(CommitOutcome::Committed { batch_id })
}

fn competition_id(tx: &Transaction<'_>, key: &CompetitionKey) -> rusqlite::Result<i64> {
    tx.execute(
        "INSERT OR IGNORE INTO competitions (region, year) VALUES (?1, ?2)",
        params![key.region, key.year],
    )?;
    tx.query_row(
        "SELECT id FROM competitions WHERE region = ?1 AND year = ?2",
        params![key.region, key.year],
        |row| row.get(0),
    )
}

fn insert_aggregate(
    tx: &Transaction<'_>,
    batch_id: &str,
    competition_id: i64,
    e: &ScoredEntity,
) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT INTO aggregates
            (batch_id, competition_id, match_number, match_name, discipline_raw, discipline,
             place, sid, state, info, score)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            batch_id,
            competition_id,
            e.match_number,
            e.match_name,
            e.discipline_raw,
            e.discipline,
            e.place,
            e.sid,
            e.state,
            e.info,
            e.score,
        ],
    )?;
    Ok(())
}

fn insert_string(
    tx: &Transaction<'_>,
    batch_id: &str,
    competition_id: i64,
    e: &ScoredEntity,
) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT INTO strings
            (batch_id, competition_id, match_number, match_name, distance, distance_unit,
             discipline_raw, discipline, place, sid, state, info, score, shots_raw)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            batch_id,
            competition_id,
            e.match_number,
            e.match_name,
            e.distance,
            e.distance_unit,
            e.discipline_raw,
            e.discipline,
            e.place,
            e.sid,
            e.state,
            e.info,
            e.score,
            e.shots_raw,
        ],
    )?;

    let string_id = tx.last_insert_rowid();
    let mut stmt =
        tx.prepare_cached("INSERT INTO shots (string_id, shot_number, value) VALUES (?1, ?2, ?3)")?;
    for shot in &e.shots {
        stmt.execute(params![string_id, shot.number, shot.value.to_string()])?;
    }
    Ok(())
}

// ============================================================================
// READ SIDE
// ============================================================================

/// A stored aggregate or string, flattened for reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResult {
    pub kind: ResultKind,
    pub competition: CompetitionKey,
    pub match_number: Option<i64>,
    pub match_name: String,
    pub discipline: String,
    pub place: Option<i64>,
    pub sid: Sid,
    pub score: Option<f64>,
    pub shots_raw: Option<String>,
}

/// Every stored result; aggregates first, then strings, each in insert order
pub fn load_stored_results(conn: &Connection) -> Result<Vec<StoredResult>> {
    let mut results = Vec::new();

    for (table, kind, shots) in [
        ("aggregates", ResultKind::Aggregate, "NULL"),
        ("strings", ResultKind::String, "r.shots_raw"),
    ] {
        let mut stmt = conn.prepare(&format!(
            "SELECT c.region, c.year, r.match_name, r.discipline, r.place, r.sid, r.score, {shots},
                    r.match_number
             FROM {table} r JOIN competitions c ON c.id = r.competition_id
             ORDER BY r.id"
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok(StoredResult {
                kind,
                competition: CompetitionKey {
                    region: row.get(0)?,
                    year: row.get(1)?,
                },
                match_number: row.get(8)?,
                match_name: row.get(2)?,
                discipline: row.get(3)?,
                place: row.get(4)?,
                sid: row.get(5)?,
                score: row.get(6)?,
                shots_raw: row.get(7)?,
            })
        })?;
        for row in rows {
            results.push(row?);
        }
    }

    Ok(results)
}

/// Shot values with the discipline of their string, optionally one discipline
pub fn load_shot_values(conn: &Connection, discipline: Option<&str>) -> Result<Vec<(String, char)>> {
    let mut stmt = conn.prepare(
        "SELECT s.discipline, sh.value
         FROM shots sh JOIN strings s ON s.id = sh.string_id
         WHERE ?1 IS NULL OR s.discipline = ?1
         ORDER BY sh.string_id, sh.shot_number",
    )?;
    let values = stmt
        .query_map(params![discipline], |row| {
            let discipline: String = row.get(0)?;
            let value: String = row.get(1)?;
            Ok((discipline, value.chars().next().unwrap_or('?')))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(values)
}

pub fn load_shots_for_shooter(conn: &Connection, sid: Sid) -> Result<Vec<ShotRecord>> {
    let mut stmt = conn.prepare(
        "SELECT sh.shot_number, sh.value
         FROM shots sh JOIN strings s ON s.id = sh.string_id
         WHERE s.sid = ?1
         ORDER BY sh.string_id, sh.shot_number",
    )?;
    let shots = stmt
        .query_map(params![sid], |row| {
            let value: String = row.get(1)?;
            Ok(ShotRecord {
                number: row.get(0)?,
                value: value.chars().next().unwrap_or('?'),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(shots)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitionSummary {
    pub region: String,
    pub year: i32,
    pub name: String,
    pub aggregates: i64,
    pub strings: i64,
}

pub fn list_competitions(conn: &Connection) -> Result<Vec<CompetitionSummary>> {
    let mut stmt = conn.prepare(
        "SELECT c.region, c.year,
                (SELECT COUNT(*) FROM aggregates a WHERE a.competition_id = c.id),
                (SELECT COUNT(*) FROM strings s WHERE s.competition_id = c.id)
         FROM competitions c
         ORDER BY c.year DESC, c.region",
    )?;
    let competitions = stmt
        .query_map([], |row| {
            let region: String = row.get(0)?;
            let year: i32 = row.get(1)?;
            Ok(CompetitionSummary {
                name: format!("{} {}", region, year),
                region,
                year,
                aggregates: row.get(2)?,
                strings: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(competitions)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseStats {
    pub regions: i64,
    pub clubs: i64,
    pub shooters: i64,
    pub competitions: i64,
    pub aggregates: i64,
    pub strings: i64,
    pub shots: i64,
    pub unmatched_results: i64,
    pub import_batches: i64,
}

pub fn database_stats(conn: &Connection) -> Result<DatabaseStats> {
    let count = |table: &str| -> Result<i64> {
        let n = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(n)
    };

    Ok(DatabaseStats {
        regions: count("regions")?,
        clubs: count("clubs")?,
        shooters: count("shooters")?,
        competitions: count("competitions")?,
        aggregates: count("aggregates")?,
        strings: count("strings")?,
        shots: count("shots")?,
        unmatched_results: count("unmatched_results")?,
        import_batches: count("import_batches")?,
    })
}

// ============================================================================
// TESTS
// ============================================================================
