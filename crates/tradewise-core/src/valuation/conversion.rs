// Points-to-dollars conversion.
//
// Calibrates how many auction dollars one weekly fantasy point is worth at
// each position, from what the league actually paid. Positions with no
// usable auction data borrow the league-wide rate, and a league with no
// auction history at all falls back to spreading the distributable budget
// over projected points.

use std::collections::BTreeMap;

use crate::model::{LeagueSnapshot, PlayerStats, Position, ALL_POSITIONS};

/// Dollars per weekly fantasy point, by position.
#[derive(Debug, Clone, PartialEq)]
pub struct PointRates {
    by_position: BTreeMap<Position, f64>,
    league_rate: f64,
}

impl PointRates {
    /// Rate for `pos`, falling back to the league-wide rate.
    pub fn rate(&self, pos: Position) -> f64 {
        self.by_position
            .get(&pos)
            .copied()
            .unwrap_or(self.league_rate)
    }

    pub fn league_rate(&self) -> f64 {
        self.league_rate
    }

    /// Build rates directly, for callers that calibrate elsewhere.
    pub fn from_parts(by_position: BTreeMap<Position, f64>, league_rate: f64) -> Self {
        PointRates {
            by_position,
            league_rate,
        }
    }
}

/// Market anchor before weighting: the auction price, else the market prior,
/// else zero.
pub fn raw_anchor(stats: Option<&PlayerStats>) -> f64 {
    let Some(stats) = stats else {
        return 0.0;
    };
    stats
        .auction_price
        .filter(|p| p.is_finite())
        .or_else(|| stats.market_prior.filter(|p| p.is_finite()))
        .unwrap_or(0.0)
        .max(0.0)
}

/// Compute the league's per-position points-to-dollars rates.
///
/// Algorithm:
/// 1. For each position, sum anchors and expected points over players that
///    have both positive. `rate = dollars / points`.
/// 2. The league rate is the same ratio over every position.
/// 3. With no auction history, `league_rate = distributable / total points`,
///    where `distributable = num_teams * (budget - roster_size * min_bid)`.
pub fn compute_point_rates(snapshot: &LeagueSnapshot) -> PointRates {
    let mut dollars: BTreeMap<Position, f64> = BTreeMap::new();
    let mut points: BTreeMap<Position, f64> = BTreeMap::new();
    let mut all_projected_points = 0.0;

    for player in &snapshot.players {
        let stats = snapshot.stats_for(&player.id);
        let expected = stats.and_then(|s| s.expected_points()).unwrap_or(0.0);
        if expected <= 0.0 {
            continue;
        }
        all_projected_points += expected;

        let anchor = raw_anchor(stats);
        if anchor > 0.0 {
            *dollars.entry(player.position).or_insert(0.0) += anchor;
            *points.entry(player.position).or_insert(0.0) += expected;
        }
    }

    let total_dollars: f64 = dollars.values().sum();
    let total_points: f64 = points.values().sum();

    let league_rate = if total_points > 0.0 {
        total_dollars / total_points
    } else if all_projected_points > 0.0 {
        let settings = &snapshot.settings;
        let per_team = settings.auction_budget - settings.roster_size() as f64 * settings.min_bid;
        let distributable = (settings.num_teams as f64 * per_team).max(0.0);
        distributable / all_projected_points
    } else {
        0.0
    };

    let mut by_position = BTreeMap::new();
    for &pos in ALL_POSITIONS {
        let pts = points.get(&pos).copied().unwrap_or(0.0);
        if pts > 0.0 {
            by_position.insert(pos, dollars.get(&pos).copied().unwrap_or(0.0) / pts);
        }
    }

    PointRates {
        by_position,
        league_rate,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{league_with, stats};
    use crate::model::Player;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn anchor_prefers_auction_then_prior() {
        let mut s = stats("p", Some(30.0), None, &[]);
        s.market_prior = Some(12.0);
        assert_eq!(raw_anchor(Some(&s)), 30.0);
        s.auction_price = None;
        assert_eq!(raw_anchor(Some(&s)), 12.0);
        s.market_prior = None;
        assert_eq!(raw_anchor(Some(&s)), 0.0);
        assert_eq!(raw_anchor(None), 0.0);
    }

    #[test]
    fn per_position_rates_from_auction_prices() {
        let players = vec![
            Player::new("qb1", "QB One", Position::Quarterback),
            Player::new("qb2", "QB Two", Position::Quarterback),
            Player::new("rb1", "RB One", Position::RunningBack),
        ];
        let stats = vec![
            stats("qb1", Some(40.0), Some(20.0), &[]),
            stats("qb2", Some(20.0), Some(10.0), &[]),
            stats("rb1", Some(30.0), Some(10.0), &[]),
        ];
        let snap = league_with(players, stats);
        let rates = compute_point_rates(&snap);

        // QB: 60 / 30 = 2.0; RB: 30 / 10 = 3.0; league: 90 / 40 = 2.25
        assert!(approx_eq(rates.rate(Position::Quarterback), 2.0, 1e-9));
        assert!(approx_eq(rates.rate(Position::RunningBack), 3.0, 1e-9));
        assert!(approx_eq(rates.league_rate(), 2.25, 1e-9));
        // WR has no data and borrows the league rate.
        assert!(approx_eq(rates.rate(Position::WideReceiver), 2.25, 1e-9));
    }

    #[test]
    fn budget_fallback_without_auction_history() {
        let players = vec![Player::new("wr1", "WR One", Position::WideReceiver)];
        let stats = vec![stats("wr1", None, Some(10.0), &[])];
        let snap = league_with(players, stats);
        let rates = compute_point_rates(&snap);

        let settings = &snap.settings;
        let distributable = settings.num_teams as f64
            * (settings.auction_budget - settings.roster_size() as f64 * settings.min_bid);
        assert!(approx_eq(rates.league_rate(), distributable / 10.0, 1e-9));
    }

    #[test]
    fn empty_league_has_zero_rate() {
        let snap = league_with(vec![], vec![]);
        let rates = compute_point_rates(&snap);
        assert_eq!(rates.league_rate(), 0.0);
        assert_eq!(rates.rate(Position::Kicker), 0.0);
    }
}
