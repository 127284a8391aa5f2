// Positional weakness and need scoring.
//
// A team's starters at each position are compared against a league target:
// the slot count times the average weekly points of a league-average starter
// there. Shortfalls convert to dollars via the position's value-per-point
// rate; surpluses count for nothing, so strength at one position never hides
// a hole at another.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::NeedConfig;
use crate::model::{LeagueSnapshot, Player, Position, ALL_POSITIONS};
use crate::valuation::conversion::{compute_point_rates, PointRates};
use crate::valuation::round2;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// One deficient position on a team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaknessItem {
    pub position: Position,
    /// Weekly points below the positional target.
    pub deficit_pts: f64,
    /// Dollar equivalent of the shortfall.
    pub deficit_value: f64,
}

/// A team's aggregate need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamWeakness {
    pub need_score: f64,
    pub items: Vec<WeaknessItem>,
}

// ---------------------------------------------------------------------------
// Need model
// ---------------------------------------------------------------------------

/// League-derived positional targets and rates used to score any roster.
#[derive(Debug, Clone, PartialEq)]
pub struct NeedModel {
    slots: BTreeMap<Position, usize>,
    targets: BTreeMap<Position, f64>,
    rates: PointRates,
    weights: NeedConfig,
}

impl NeedModel {
    /// Derive targets from the league's player pool.
    ///
    /// For each started position, the target is `slots * average points` of
    /// the league's top `slots * num_teams` players there. Player points come
    /// from `points`, falling back to the raw stats expectation.
    pub fn from_league(snapshot: &LeagueSnapshot, weights: &NeedConfig) -> Self {
        let rates = compute_point_rates(snapshot);
        let mut slots = BTreeMap::new();
        let mut targets = BTreeMap::new();

        for &pos in ALL_POSITIONS {
            let per_team = snapshot.settings.slots(pos);
            if per_team == 0 {
                continue;
            }
            slots.insert(pos, per_team);

            let mut pool: Vec<f64> = snapshot
                .players
                .iter()
                .filter(|p| p.position == pos)
                .filter_map(|p| {
                    p.points
                        .filter(|x| x.is_finite())
                        .or_else(|| snapshot.stats_for(&p.id).and_then(|s| s.expected_points()))
                })
                .collect();
            pool.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
            pool.truncate(per_team * snapshot.settings.num_teams);

            let avg_starter = if pool.is_empty() {
                0.0
            } else {
                pool.iter().sum::<f64>() / pool.len() as f64
            };
            targets.insert(pos, per_team as f64 * avg_starter);
        }

        NeedModel {
            slots,
            targets,
            rates,
            weights: weights.clone(),
        }
    }

    /// Build a model from explicit targets, for callers that calibrate
    /// elsewhere.
    pub fn from_parts(
        slots: BTreeMap<Position, usize>,
        targets: BTreeMap<Position, f64>,
        rates: PointRates,
        weights: NeedConfig,
    ) -> Self {
        NeedModel {
            slots,
            targets,
            rates,
            weights,
        }
    }

    pub fn target(&self, pos: Position) -> f64 {
        self.targets.get(&pos).copied().unwrap_or(0.0)
    }

    pub fn rate(&self, pos: Position) -> f64 {
        self.rates.rate(pos)
    }

    /// Weekly points a player contributes: projected points, else price
    /// converted back through the position rate, else zero.
    pub fn player_points(&self, player: &Player) -> f64 {
        if let Some(points) = player.points.filter(|p| p.is_finite()) {
            return points;
        }
        let rate = self.rate(player.position);
        if rate > 0.0 {
            player.value_or_zero() / rate
        } else {
            0.0
        }
    }

    /// Starter points the roster fields at `pos`: the best `slots` players.
    pub fn current_points(&self, roster: &[Player], pos: Position) -> f64 {
        let slots = self.slots.get(&pos).copied().unwrap_or(0);
        let mut points: Vec<f64> = roster
            .iter()
            .filter(|p| p.position == pos)
            .map(|p| self.player_points(p))
            .collect();
        points.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        points.into_iter().take(slots).sum()
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Score a roster's weaknesses.
///
/// `needScore = sum(weight[pos] * deficitValue)` over deficient positions.
/// Items are ordered by deficit value (largest first), ties by position.
pub fn calculate_team_weakness(roster: &[Player], model: &NeedModel) -> TeamWeakness {
    let mut items = Vec::new();
    let mut need_score = 0.0;

    for &pos in model.slots.keys() {
        let target = model.target(pos);
        let current = model.current_points(roster, pos);
        if current >= target {
            continue;
        }

        let deficit_pts = round2(target - current);
        let deficit_value = round2(deficit_pts * model.rate(pos));
        if deficit_pts <= 0.0 {
            continue;
        }

        need_score += model.weights.weight(pos) * deficit_value;
        items.push(WeaknessItem {
            position: pos,
            deficit_pts,
            deficit_value,
        });
    }

    items.sort_by(|a, b| {
        b.deficit_value
            .partial_cmp(&a.deficit_value)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.position.sort_order().cmp(&b.position.sort_order()))
    });

    TeamWeakness {
        need_score: round2(need_score.max(0.0)),
        items,
    }
}

/// Deficit points by position (zero for positions at or above target).
pub fn position_deficits(roster: &[Player], model: &NeedModel) -> BTreeMap<Position, f64> {
    model
        .slots
        .keys()
        .map(|&pos| {
            let deficit = (model.target(pos) - model.current_points(roster, pos)).max(0.0);
            (pos, round2(deficit))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
