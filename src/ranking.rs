// 🏆 Aggregation Ranker - leaderboards over in-memory scores
//
// Every function here is pure: input slices are borrowed, never reordered,
// and every sort is stable, so equal keys keep their input order.
//
// Three shapes of output:
// - per-discipline leaderboards (wins, podiums, averages...)
// - cross-discipline MCSI leaderboard (minimum sample, top-K mean)
// - event ranking (flat entity list + per-shooter sum/mean)

use crate::entities::region::CompetitionKey;
use crate::entities::shooter::Sid;
use crate::score::round_to;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::Hash;

// ============================================================================
// GENERIC RANKING
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranked<T> {
    /// 1-based position
    pub rank: usize,
    pub item: T,
}

/// Order items by descending key. Ties keep input order.
pub fn rank_by<T, F>(items: &[T], key_fn: F) -> Vec<Ranked<&T>>
where
    F: Fn(&T) -> f64,
{
    let mut keyed: Vec<(f64, &T)> = items.iter().map(|item| (key_fn(item), item)).collect();
    keyed.sort_by(|a, b| b.0.total_cmp(&a.0));

    keyed
        .into_iter()
        .enumerate()
        .map(|(i, (_, item))| Ranked { rank: i + 1, item })
        .collect()
}

/// Which group statistic decides the order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankMetric {
    TopKMean,
    Mean,
    Total,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankOptions {
    /// Groups with fewer values are left out
    pub min_sample: usize,

    /// Window for the top-K mean; `None` (or 0) means every value
    pub top_k: Option<usize>,

    pub metric: RankMetric,
}

impl Default for RankOptions {
    fn default() -> Self {
        RankOptions {
            min_sample: 1,
            top_k: None,
            metric: RankMetric::Mean,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStats<G> {
    pub key: G,
    pub count: usize,
    pub total: f64,
    pub mean: f64,
    pub best: f64,

    /// Mean of the K highest values, K capped at `count`
    pub top_k_mean: f64,
    pub top_k: usize,
}

/// Group values, drop small groups, and rank the rest.
///
/// Groups appear in first-encounter order before sorting, so ties between
/// groups resolve to whichever group was seen first.
pub fn rank<T, G, KG, KV>(
    items: &[T],
    group_fn: KG,
    key_fn: KV,
    options: &RankOptions,
) -> Vec<Ranked<GroupStats<G>>>
where
    G: Eq + Hash + Clone,
    KG: Fn(&T) -> G,
    KV: Fn(&T) -> f64,
{
    let mut order: Vec<G> = Vec::new();
    let mut values: HashMap<G, Vec<f64>> = HashMap::new();

    for item in items {
        let group = group_fn(item);
        values
            .entry(group.clone())
            .or_insert_with(|| {
                order.push(group);
                Vec::new()
            })
            .push(key_fn(item));
    }

    let mut stats: Vec<GroupStats<G>> = order
        .into_iter()
        .filter_map(|group| {
            let vals = values.remove(&group)?;
            if vals.len() < options.min_sample.max(1) {
                return None;
            }
            Some(group_stats(group, vals, options.top_k))
        })
        .collect();

    let metric = |s: &GroupStats<G>| match options.metric {
        RankMetric::TopKMean => s.top_k_mean,
        RankMetric::Mean => s.mean,
        RankMetric::Total => s.total,
    };
    stats.sort_by(|a, b| metric(b).total_cmp(&metric(a)));

    stats
        .into_iter()
        .enumerate()
        .map(|(i, item)| Ranked { rank: i + 1, item })
        .collect()
}

fn group_stats<G>(key: G, mut vals: Vec<f64>, top_k: Option<usize>) -> GroupStats<G> {
    let count = vals.len();
    let total: f64 = vals.iter().sum();
    let best = vals.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let k = match top_k {
        Some(k) if k > 0 => k.min(count),
        _ => count,
    };
    vals.sort_by(|a, b| b.total_cmp(a));
    let top_total: f64 = vals.iter().take(k).sum();

    GroupStats {
        key,
        count,
        total: round_to(total, 2),
        mean: round_to(total / count as f64, 2),
        best,
        top_k_mean: round_to(top_total / k as f64, 2),
        top_k: k,
    }
}

// ============================================================================
// PER-DISCIPLINE LEADERBOARD
// ============================================================================

/// One shooter's result in one discipline (canonical code)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placing {
    pub sid: Sid,
    pub discipline: String,
    pub score: Option<f64>,
    pub place: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortKey {
    BestScore,
    TotalScore,
    AverageScore,
    Wins,
    Podiums,
    Entries,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardOptions {
    /// Compared left to right, all descending
    pub order: Vec<SortKey>,
    pub min_entries: usize,
    pub limit: Option<usize>,
}

impl Default for LeaderboardOptions {
    fn default() -> Self {
        LeaderboardOptions {
            order: vec![SortKey::BestScore],
            min_entries: 1,
            limit: None,
        }
    }
}

impl LeaderboardOptions {
    /// Wins, then podiums, then average score
    pub fn honours(min_entries: usize, limit: usize) -> Self {
        LeaderboardOptions {
            order: vec![SortKey::Wins, SortKey::Podiums, SortKey::AverageScore],
            min_entries,
            limit: Some(limit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub sid: Sid,
    pub discipline: String,
    pub entries: usize,
    pub wins: usize,
    pub podiums: usize,
    pub total: f64,

    /// Over entries that recorded a score; 0.0 when none did
    pub average: f64,
    pub best: Option<f64>,
}

impl LeaderboardRow {
    fn key(&self, key: SortKey) -> f64 {
        match key {
            SortKey::BestScore => self.best.unwrap_or(f64::NEG_INFINITY),
            SortKey::TotalScore => self.total,
            SortKey::AverageScore => self.average,
            SortKey::Wins => self.wins as f64,
            SortKey::Podiums => self.podiums as f64,
            SortKey::Entries => self.entries as f64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisciplineLeaderboard {
    pub discipline: String,
    pub rows: Vec<Ranked<LeaderboardRow>>,
}

/// One leaderboard per discipline, disciplines in first-encounter order
pub fn discipline_leaderboards(
    placings: &[Placing],
    options: &LeaderboardOptions,
) -> Vec<DisciplineLeaderboard> {
    let mut disciplines: Vec<String> = Vec::new();
    let mut rows: Vec<LeaderboardRow> = Vec::new();
    let mut slot: HashMap<(String, Sid), usize> = HashMap::new();
    let mut scored: Vec<usize> = Vec::new();

    for p in placings {
        if !disciplines.contains(&p.discipline) {
            disciplines.push(p.discipline.clone());
        }

        let index = *slot.entry((p.discipline.clone(), p.sid)).or_insert_with(|| {
            rows.push(LeaderboardRow {
                sid: p.sid,
                discipline: p.discipline.clone(),
                entries: 0,
                wins: 0,
                podiums: 0,
                total: 0.0,
                average: 0.0,
                best: None,
            });
            scored.push(0);
            rows.len() - 1
        });

        let row = &mut rows[index];
        row.entries += 1;
        if p.place == Some(1) {
            row.wins += 1;
        }
        if matches!(p.place, Some(place) if place <= 3) {
            row.podiums += 1;
        }
        if let Some(score) = p.score {
            row.total += score;
            row.best = Some(row.best.map_or(score, |b| b.max(score)));
            scored[index] += 1;
        }
    }

    for (row, n) in rows.iter_mut().zip(&scored) {
        row.total = round_to(row.total, 2);
        if *n > 0 {
            row.average = round_to(row.total / *n as f64, 2);
        }
    }

    disciplines
        .into_iter()
        .map(|discipline| {
            let mut board: Vec<LeaderboardRow> = rows
                .iter()
                .filter(|r| r.discipline == discipline && r.entries >= options.min_entries)
                .cloned()
                .collect();

            board.sort_by(|a, b| compare_rows(a, b, &options.order));
            if let Some(limit) = options.limit {
                board.truncate(limit);
            }

            DisciplineLeaderboard {
                discipline,
                rows: board
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| Ranked { rank: i + 1, item })
                    .collect(),
            }
        })
        .collect()
}

fn compare_rows(a: &LeaderboardRow, b: &LeaderboardRow, order: &[SortKey]) -> Ordering {
    order
        .iter()
        .map(|&key| b.key(key).total_cmp(&a.key(key)))
        .find(|o| *o != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

// ============================================================================
// MCSI LEADERBOARDS
// ============================================================================

/// One MCSI-eligible scored entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McsiEntry {
    pub sid: Sid,
    pub competition: CompetitionKey,
    pub match_name: String,
    pub discipline: String,
    pub mcsi: f64,
}

/// Shooters with at least `min_sample` scores, ranked by their top-K mean
pub fn mcsi_leaderboard(
    entries: &[McsiEntry],
    min_sample: usize,
    top_k: usize,
) -> Vec<Ranked<GroupStats<Sid>>> {
    rank(
        entries,
        |e| e.sid,
        |e| e.mcsi,
        &RankOptions {
            min_sample,
            top_k: Some(top_k),
            metric: RankMetric::TopKMean,
        },
    )
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRanking {
    pub competition: CompetitionKey,

    /// Every scored entity, highest MCSI first
    pub entries: Vec<Ranked<McsiEntry>>,
    pub shooters_by_total: Vec<Ranked<GroupStats<Sid>>>,
    pub shooters_by_mean: Vec<Ranked<GroupStats<Sid>>>,
}

/// Rank one competition's MCSI entries; other competitions are ignored
pub fn event_ranking(entries: &[McsiEntry], competition: &CompetitionKey) -> EventRanking {
    let in_event: Vec<McsiEntry> = entries
        .iter()
        .filter(|e| &e.competition == competition)
        .cloned()
        .collect();

    let flat = rank_by(&in_event, |e| e.mcsi)
        .into_iter()
        .map(|r| Ranked {
            rank: r.rank,
            item: r.item.clone(),
        })
        .collect();

    let by = |metric| {
        rank(
            &in_event,
            |e| e.sid,
            |e| e.mcsi,
            &RankOptions {
                min_sample: 1,
                top_k: None,
                metric,
            },
        )
    };

    EventRanking {
        competition: competition.clone(),
        entries: flat,
        shooters_by_total: by(RankMetric::Total),
        shooters_by_mean: by(RankMetric::Mean),
    }
}

// ============================================================================
// TESTS
// ============================================================================
