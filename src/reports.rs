// 📊 Reports - query-time views over stored results
//
// Everything here is a pure function of rows already loaded from the store,
// so each report can be tested without a database.

use crate::config::ReportSettings;
use crate::db::StoredResult;
use crate::disciplines::DisciplineNormalizer;
use crate::entities::region::CompetitionKey;
use crate::entities::shooter::{ShooterRegistryEntry, Sid};
use crate::import::ResultKind;
use crate::mcsi::{McsiEngine, McsiOutcome};
use crate::ranking::{
    discipline_leaderboards, event_ranking, mcsi_leaderboard, DisciplineLeaderboard,
    EventRanking, GroupStats, LeaderboardOptions, McsiEntry, Placing, Ranked,
};
use crate::score::{round_to, ShotRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

fn is_grand_aggregate(r: &StoredResult) -> bool {
    r.kind == ResultKind::Aggregate && r.match_name.contains("Grand")
}

// ============================================================================
// HONOURS
// ============================================================================

/// Grand aggregate honours per discipline: wins, then podiums, then average.
///
/// `discipline` may be a raw label or a canonical code; `None` reports
/// every discipline.
pub fn top_shooters(
    results: &[StoredResult],
    normalizer: &DisciplineNormalizer,
    discipline: Option<&str>,
    settings: &ReportSettings,
) -> Vec<DisciplineLeaderboard> {
    let wanted = discipline.map(|d| normalizer.normalize(d));

    let placings: Vec<Placing> = results
        .iter()
        .filter(|r| is_grand_aggregate(r))
        .filter(|r| wanted.map_or(true, |w| r.discipline == w))
        .map(|r| Placing {
            sid: r.sid,
            discipline: r.discipline.clone(),
            score: r.score,
            place: r.place,
        })
        .collect();

    discipline_leaderboards(
        &placings,
        &LeaderboardOptions::honours(
            settings.top_shooters_min_entries,
            settings.top_shooters_limit,
        ),
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisciplineParticipation {
    pub year: i32,
    pub discipline: String,
    pub shooters: usize,
}

/// Distinct shooters per (year, discipline) over Grand aggregates
pub fn discipline_stats(results: &[StoredResult]) -> Vec<DisciplineParticipation> {
    let mut seen: BTreeMap<(i32, String), BTreeSet<Sid>> = BTreeMap::new();
    for r in results.iter().filter(|r| is_grand_aggregate(r)) {
        seen.entry((r.competition.year, r.discipline.clone()))
            .or_default()
            .insert(r.sid);
    }

    seen.into_iter()
        .map(|((year, discipline), sids)| DisciplineParticipation {
            year,
            discipline,
            shooters: sids.len(),
        })
        .collect()
}

// ============================================================================
// SHOTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotBucket {
    pub value: String,
    pub count: usize,

    /// Share of all shots, one decimal place
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotDistribution {
    pub total: usize,
    pub buckets: Vec<ShotBucket>,
}

/// Count shot values; buckets come out in value order
pub fn shot_distribution<I>(values: I) -> ShotDistribution
where
    I: IntoIterator<Item = char>,
{
    let mut counts: BTreeMap<char, usize> = BTreeMap::new();
    for v in values {
        *counts.entry(v).or_default() += 1;
    }
    let total: usize = counts.values().sum();

    let buckets = counts
        .into_iter()
        .map(|(value, count)| ShotBucket {
            value: value.to_string(),
            count,
            percent: round_to(count as f64 * 100.0 / total as f64, 1),
        })
        .collect();

    ShotDistribution { total, buckets }
}

// ============================================================================
// SHOOTER PROFILE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShooterProfile {
    pub shooter: ShooterRegistryEntry,
    pub display_name: String,

    /// Aggregates, newest competition year first
    pub history: Vec<StoredResult>,
    pub shots: ShotDistribution,
}

pub fn shooter_profile(
    shooter: ShooterRegistryEntry,
    results: &[StoredResult],
    shots: &[ShotRecord],
) -> ShooterProfile {
    let mut history: Vec<StoredResult> = results
        .iter()
        .filter(|r| r.sid == shooter.sid && r.kind == ResultKind::Aggregate)
        .cloned()
        .collect();
    history.sort_by(|a, b| b.competition.year.cmp(&a.competition.year));

    ShooterProfile {
        display_name: shooter.display_name(),
        shooter,
        history,
        shots: shot_distribution(shots.iter().map(|s| s.value)),
    }
}

// ============================================================================
// MCSI
// ============================================================================

/// Shots behind an aggregate, gathered from the shooter's strings in the
/// same competition and discipline. Strings sharing the aggregate's match
/// number are preferred when there are any.
fn aggregate_shots(results: &[StoredResult], aggregate: &StoredResult) -> Option<String> {
    let strings: Vec<&StoredResult> = results
        .iter()
        .filter(|r| {
            r.kind == ResultKind::String
                && r.sid == aggregate.sid
                && r.competition == aggregate.competition
                && r.discipline == aggregate.discipline
                && r.shots_raw.is_some()
        })
        .collect();

    let same_match: Vec<&StoredResult> = match aggregate.match_number {
        Some(n) => strings
            .iter()
            .copied()
            .filter(|r| r.match_number == Some(n))
            .collect(),
        None => Vec::new(),
    };
    let chosen = if same_match.is_empty() { strings } else { same_match };
    if chosen.is_empty() {
        return None;
    }

    Some(chosen.iter().filter_map(|r| r.shots_raw.as_deref()).collect())
}

/// MCSI for every stored aggregate that has one.
///
/// The competition's region and year select override rules. An aggregate
/// converted under an override takes its shots from the matching strings.
/// Scores that cannot be encoded are skipped with a warning.
pub fn mcsi_entries(results: &[StoredResult], engine: &McsiEngine) -> Vec<McsiEntry> {
    let mut entries = Vec::new();

    for r in results.iter().filter(|r| r.kind == ResultKind::Aggregate) {
        let shots = r.shots_raw.clone().or_else(|| aggregate_shots(results, r));
        let outcome = engine.compute(
            r.score,
            &r.discipline,
            Some(r.competition.region.as_str()),
            Some(r.competition.year),
            shots.as_deref(),
        );

        match outcome {
            Ok(McsiOutcome::Eligible(v)) => entries.push(McsiEntry {
                sid: r.sid,
                competition: r.competition.clone(),
                match_name: r.match_name.clone(),
                discipline: v.canonical,
                mcsi: v.value,
            }),
            Ok(McsiOutcome::NotEligible(_)) => {}
            Err(e) => warn!(sid = r.sid, competition = %r.competition.name(), "skipping MCSI: {}", e),
        }
    }

    entries
}

pub fn mcsi_report(
    results: &[StoredResult],
    engine: &McsiEngine,
    min_sample: usize,
    top_k: usize,
) -> Vec<Ranked<GroupStats<Sid>>> {
    mcsi_leaderboard(&mcsi_entries(results, engine), min_sample, top_k)
}

pub fn event_report(
    results: &[StoredResult],
    engine: &McsiEngine,
    competition: &CompetitionKey,
) -> EventRanking {
    let in_event: Vec<StoredResult> = results
        .iter()
        .filter(|r| &r.competition == competition)
        .cloned()
        .collect();
    event_ranking(&mcsi_entries(&in_event, engine), competition)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disciplines::DisciplineFamily;
    use crate::mcsi::{FamilyParameters, McsiTable, OverrideRule, OverrideTable};

    fn agg(sid: Sid, year: i32, match_name: &str, discipline: &str, place: i64, score: f64) -> StoredResult {
        StoredResult {
            kind: ResultKind::Aggregate,
            competition: CompetitionKey::new("QRA", year),
            match_number: None,
            match_name: match_name.to_string(),
            discipline: discipline.to_string(),
            place: Some(place),
            sid,
            score: Some(score),
            shots_raw: None,
        }
    }

    fn honours_results() -> Vec<StoredResult> {
        vec![
            agg(1, 2021, "Grand Aggregate", "TR-A", 1, 290.1),
            agg(1, 2022, "Grand Aggregate", "TR-A", 2, 289.0),
            agg(1, 2023, "Grand Aggregate", "TR-A", 1, 291.3),
            agg(2, 2021, "Grand Aggregate", "TR-A", 2, 289.9),
            agg(2, 2022, "Grand Aggregate", "TR-A", 1, 292.0),
            agg(2, 2023, "Grand Aggregate", "TR-A", 5, 280.0),
            // Only two Grand entries
            agg(3, 2022, "Grand Aggregate", "TR-A", 1, 295.0),
            agg(3, 2023, "Grand Aggregate", "TR-A", 1, 295.0),
            // Not a Grand aggregate
            agg(3, 2023, "Queens Aggregate", "TR-A", 1, 150.0),
        ]
    }

    #[test]
    fn test_top_shooters_orders_by_wins_then_podiums() {
        let boards = top_shooters(
            &honours_results(),
            &DisciplineNormalizer::default(),
            Some("Target Rifle - A"),
            &ReportSettings::default(),
        );

        assert_eq!(boards.len(), 1);
        let rows = &boards[0].rows;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].item.sid, 1);
        assert_eq!(rows[0].item.wins, 2);
        assert_eq!(rows[1].item.sid, 2);
        assert_eq!(rows[1].item.podiums, 2);
    }

    #[test]
    fn test_top_shooters_other_discipline_is_empty() {
        let boards = top_shooters(
            &honours_results(),
            &DisciplineNormalizer::default(),
            Some("F-Open"),
            &ReportSettings::default(),
        );
        assert!(boards.is_empty());
    }

    #[test]
    fn test_discipline_stats_counts_distinct_shooters() {
        let stats = discipline_stats(&honours_results());

        assert_eq!(
            stats,
            vec![
                DisciplineParticipation { year: 2021, discipline: "TR-A".into(), shooters: 2 },
                DisciplineParticipation { year: 2022, discipline: "TR-A".into(), shooters: 3 },
                DisciplineParticipation { year: 2023, discipline: "TR-A".into(), shooters: 3 },
            ]
        );
    }

    #[test]
    fn test_shot_distribution() {
        let dist = shot_distribution("V5V45".chars());

        assert_eq!(dist.total, 5);
        let values: Vec<&str> = dist.buckets.iter().map(|b| b.value.as_str()).collect();
        assert_eq!(values, vec!["4", "5", "V"]);
        assert_eq!(dist.buckets[2].count, 2);
        assert_eq!(dist.buckets[2].percent, 40.0);
    }

    #[test]
    fn test_shot_distribution_empty() {
        let dist = shot_distribution(std::iter::empty());
        assert_eq!(dist.total, 0);
        assert!(dist.buckets.is_empty());
    }

    #[test]
    fn test_shooter_profile_history_newest_first() {
        let shooter = ShooterRegistryEntry::new(1, "Robert", "Brown").with_preferred_name("Bob");
        let shots = crate::score::parse_shots("V5V");
        let profile = shooter_profile(shooter, &honours_results(), &shots);

        assert_eq!(profile.display_name, "Bob Brown");
        let years: Vec<i32> = profile.history.iter().map(|r| r.competition.year).collect();
        assert_eq!(years, vec![2023, 2022, 2021]);
        assert_eq!(profile.shots.total, 3);
    }

    #[test]
    fn test_mcsi_entries_skip_ineligible() {
        let results = vec![
            agg(1, 2023, "Grand Aggregate", "TR-A", 1, 149.6),
            agg(2, 2023, "Grand Aggregate", "F-Open", 1, 149.6),
            StoredResult {
                score: None,
                ..agg(3, 2023, "Grand Aggregate", "TR-A", 2, 0.0)
            },
        ];
        let entries = mcsi_entries(&results, &McsiEngine::default());

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].sid, 1);
        assert_eq!(entries[0].mcsi, 259.5);
    }

    fn sporter_override_engine() -> McsiEngine {
        let mut entries = McsiTable::default_entries();
        entries.push(FamilyParameters {
            family: DisciplineFamily::Sporter,
            multiplier: 1.0,
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

    fn string(sid: Sid, year: i32, discipline: &str, match_number: Option<i64>, shots: &str) -> StoredResult {
        StoredResult {
            kind: ResultKind::String,
            match_number,
            shots_raw: Some(shots.to_string()),
            place: None,
            ..agg(sid, year, "Match 1", discipline, 0, 0.0)
        }
    }

    #[test]
    fn test_override_converts_aggregate_using_string_shots() {
        let results = vec![
            agg(4, 2024, "Grand Aggregate", "Sporter-PC", 1, 58.4),
            string(4, 2024, "Sporter-PC", None, "6X55XX5X46"),
            // another shooter's sixes must not count
            string(5, 2024, "Sporter-PC", None, "666666"),
        ];
        let entries = mcsi_entries(&results, &sporter_override_engine());

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].mcsi, 60.0);
    }

    #[test]
    fn test_override_without_strings_keeps_points() {
        let results = vec![agg(4, 2024, "Grand Aggregate", "Sporter-PC", 1, 58.4)];
        let entries = mcsi_entries(&results, &sporter_override_engine());

        assert_eq!(entries[0].mcsi, 62.0);
    }

    #[test]
    fn test_aggregate_shots_prefer_same_match_number() {
        let aggregate = StoredResult {
            match_number: Some(3),
            ..agg(4, 2024, "Grand Aggregate", "Sporter-PC", 1, 58.4)
        };
        let results = vec![
            aggregate.clone(),
            string(4, 2024, "Sporter-PC", Some(1), "666"),
            string(4, 2024, "Sporter-PC", Some(3), "6X5"),
            string(4, 2024, "Sporter-PC", Some(3), "55X"),
        ];

        assert_eq!(aggregate_shots(&results, &aggregate).as_deref(), Some("6X555X"));

        let other_year = agg(4, 2023, "Grand Aggregate", "Sporter-PC", 1, 58.4);
        assert_eq!(aggregate_shots(&results, &other_year), None);
    }

    #[test]
    fn test_mcsi_report_minimum_sample() {
        let mut results: Vec<StoredResult> = (0..4)
            .map(|i| agg(1, 2020 + i, "Grand Aggregate", "TR-A", 1, 149.6))
            .collect();

        let engine = McsiEngine::default();
        assert!(mcsi_report(&results, &engine, 5, 5).is_empty());

        results.push(agg(1, 2024, "Grand Aggregate", "TR-A", 1, 149.6));
        let board = mcsi_report(&results, &engine, 5, 5);
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].item.top_k_mean, 259.5);
    }

    #[test]
    fn test_event_report_only_named_competition() {
        let results = vec![
            agg(1, 2023, "Grand Aggregate", "TR-A", 1, 149.6),
            agg(2, 2023, "Grand Aggregate", "TR-B", 2, 140.2),
            agg(1, 2022, "Grand Aggregate", "TR-A", 1, 100.0),
        ];
        let event = event_report(&results, &McsiEngine::default(), &CompetitionKey::new("QRA", 2023));

        assert_eq!(event.entries.len(), 2);
        assert_eq!(event.entries[0].item.sid, 1);
        assert_eq!(event.shooters_by_total.len(), 2);
    }
}
