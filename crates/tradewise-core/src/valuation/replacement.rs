// Replacement-level baselines.
//
// The replacement player at a position is the best one left over once every
// team has filled its starting slots there. Value over replacement is
// measured against that player's projected weekly points.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::model::{LeagueSnapshot, Position, ReplacementBaseline, ALL_POSITIONS};

/// Determine the replacement-level weekly points for every started position.
///
/// Algorithm:
/// 1. Collect expected points for every player at the position, sorted
///    descending.
/// 2. N = slots_per_team * num_teams. The replacement level is the (N+1)th
///    best player (index N).
/// 3. If the pool is shorter than that, the worst available player is used.
/// 4. An empty pool falls back to the snapshot's prior baseline for the
///    season; with no prior either, the position gets no entry and every
///    player there has zero VOR.
///
/// Positions the league does not start are skipped.
pub fn determine_replacement_levels(snapshot: &LeagueSnapshot) -> BTreeMap<Position, f64> {
    let mut levels = BTreeMap::new();

    for &pos in ALL_POSITIONS {
        let slots = snapshot.settings.slots(pos);
        if slots == 0 {
            continue;
        }

        let mut pool: Vec<f64> = snapshot
            .players
            .iter()
            .filter(|p| p.position == pos)
            .filter_map(|p| snapshot.stats_for(&p.id).and_then(|s| s.expected_points()))
            .collect();
        pool.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

        let starters = slots * snapshot.settings.num_teams;
        let level = if pool.len() > starters {
            Some(pool[starters])
        } else if let Some(&last) = pool.last() {
            Some(last)
        } else {
            snapshot.prior_baseline(pos)
        };

        match level {
            Some(points) => {
                levels.insert(pos, points);
            }
            None => debug!("no replacement baseline available for {pos}"),
        }
    }

    levels
}

/// Package replacement levels as persistable baseline rows.
pub fn to_baselines(
    levels: &BTreeMap<Position, f64>,
    season: u16,
    engine_version: &str,
    computed_at: DateTime<Utc>,
) -> Vec<ReplacementBaseline> {
    levels
        .iter()
        .map(|(&position, &points)| ReplacementBaseline {
            season,
            position,
            points,
            engine_version: engine_version.to_string(),
            computed_at,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
