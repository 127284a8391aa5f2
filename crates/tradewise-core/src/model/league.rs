// League settings, teams, and the per-call league snapshot.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::player::{Player, PlayerStats, Position};
use crate::error::{EngineError, EntityKind};

/// League economy and roster rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueSettings {
    pub num_teams: usize,
    /// Per-team auction budget.
    pub auction_budget: f64,
    /// Minimum legal bid per roster spot.
    #[serde(default = "default_min_bid")]
    pub min_bid: f64,
    /// Starting slots per team by position.
    pub roster_slots: BTreeMap<Position, usize>,
    #[serde(default)]
    pub bench_slots: usize,
}

fn default_min_bid() -> f64 {
    1.0
}

impl LeagueSettings {
    /// Starting slots for `pos`, zero if the league does not start it.
    pub fn slots(&self, pos: Position) -> usize {
        self.roster_slots.get(&pos).copied().unwrap_or(0)
    }

    /// Total roster spots per team, starters plus bench.
    pub fn roster_size(&self) -> usize {
        self.roster_slots.values().sum::<usize>() + self.bench_slots
    }

    /// Total auction dollars across the league.
    pub fn total_budget(&self) -> f64 {
        self.num_teams as f64 * self.auction_budget
    }
}

/// A fantasy team and the ids of the players on its roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,
    pub name: String,
    pub roster: Vec<String>,
}

/// Floor value at a position for a season: the points of the last
/// roster-worthy player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplacementBaseline {
    pub season: u16,
    pub position: Position,
    /// Projected points per week of the replacement-level player.
    pub points: f64,
    pub engine_version: String,
    pub computed_at: DateTime<Utc>,
}

/// Everything the engine needs to know about one league, loaded up front by
/// the persistence layer. The engine never mutates shared state; callers
/// clone and adjust snapshots as needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueSnapshot {
    pub league_id: String,
    pub season: u16,
    pub settings: LeagueSettings,
    pub players: Vec<Player>,
    #[serde(default)]
    pub stats: Vec<PlayerStats>,
    pub teams: Vec<Team>,
    #[serde(default)]
    pub prior_baselines: Vec<ReplacementBaseline>,
}

impl LeagueSnapshot {
    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn stats_for(&self, player_id: &str) -> Option<&PlayerStats> {
        self.stats.iter().find(|s| s.player_id == player_id)
    }

    pub fn team(&self, team_id: &str) -> Result<&Team, EngineError> {
        self.teams
            .iter()
            .find(|t| t.id == team_id)
            .ok_or_else(|| EngineError::not_found(EntityKind::Team, team_id))
    }

    /// Resolve a team's roster ids into players.
    pub fn team_roster(&self, team_id: &str) -> Result<Vec<Player>, EngineError> {
        let team = self.team(team_id)?;
        let index = self.player_index();
        team.roster
            .iter()
            .map(|id| {
                index
                    .get(id.as_str())
                    .map(|p| (*p).clone())
                    .ok_or_else(|| EngineError::not_found(EntityKind::Player, id.clone()))
            })
            .collect()
    }

    /// Id of the team rostering `player_id`, if any.
    pub fn owner_of(&self, player_id: &str) -> Option<&str> {
        self.teams
            .iter()
            .find(|t| t.roster.iter().any(|id| id == player_id))
            .map(|t| t.id.as_str())
    }

    /// Prior baseline for `pos` in this snapshot's season.
    pub fn prior_baseline(&self, pos: Position) -> Option<f64> {
        self.prior_baselines
            .iter()
            .filter(|b| b.season == self.season && b.position == pos && b.points.is_finite())
            .max_by(|a, b| a.computed_at.cmp(&b.computed_at))
            .map(|b| b.points)
    }

    /// Overwrite player prices with the given `(player_id, price)` pairs.
    /// Players not present keep their current value.
    pub fn apply_prices<'a>(&mut self, prices: impl IntoIterator<Item = (&'a str, f64)>) {
        let prices: HashMap<&str, f64> = prices.into_iter().collect();
        for player in &mut self.players {
            if let Some(&price) = prices.get(player.id.as_str()) {
                player.value = Some(price);
            }
        }
    }

    /// Fill in missing per-week points from the raw stats.
    pub fn hydrate_points(&mut self) {
        let expected: HashMap<String, f64> = self
            .stats
            .iter()
            .filter_map(|s| s.expected_points().map(|p| (s.player_id.clone(), p)))
            .collect();
        for player in &mut self.players {
            if player.points.is_none() {
                player.points = expected.get(&player.id).copied();
            }
        }
    }

    fn player_index(&self) -> HashMap<&str, &Player> {
        self.players.iter().map(|p| (p.id.as_str(), p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> LeagueSnapshot {
        let mut slots = BTreeMap::new();
        slots.insert(Position::Quarterback, 1);
        slots.insert(Position::RunningBack, 2);

        let mut qb = Player::new("qb1", "Quinn", Position::Quarterback);
        qb.value = Some(30.0);

        LeagueSnapshot {
            league_id: "lg".into(),
            season: 2025,
            settings: LeagueSettings {
                num_teams: 2,
                auction_budget: 200.0,
                min_bid: 1.0,
                roster_slots: slots,
                bench_slots: 3,
            },
            players: vec![qb, Player::new("rb1", "Ray", Position::RunningBack)],
            stats: vec![PlayerStats {
                player_id: "rb1".into(),
                projected_points: Some(14.0),
                ..Default::default()
            }],
            teams: vec![Team {
                id: "t1".into(),
                name: "Team One".into(),
                roster: vec!["qb1".into(), "rb1".into()],
            }],
            prior_baselines: vec![],
        }
    }

    #[test]
    fn roster_size_counts_bench() {
        assert_eq!(snapshot().settings.roster_size(), 6);
        assert_eq!(snapshot().settings.total_budget(), 400.0);
    }

    #[test]
    fn team_roster_resolves_players() {
        let snap = snapshot();
        let roster = snap.team_roster("t1").unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(snap.owner_of("rb1"), Some("t1"));
        assert!(matches!(
            snap.team_roster("nope"),
            Err(EngineError::NotFound { kind: EntityKind::Team, .. })
        ));
    }

    #[test]
    fn dangling_roster_id_is_not_found() {
        let mut snap = snapshot();
        snap.teams[0].roster.push("ghost".into());
        match snap.team_roster("t1") {
            Err(EngineError::NotFound { kind, id }) => {
                assert_eq!(kind, EntityKind::Player);
                assert_eq!(id, "ghost");
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn hydrate_points_keeps_existing_values() {
        let mut snap = snapshot();
        snap.players[0].points = Some(20.0);
        snap.hydrate_points();
        assert_eq!(snap.players[0].points, Some(20.0));
        assert_eq!(snap.players[1].points, Some(14.0));
    }

    #[test]
    fn apply_prices_overwrites_listed_players_only() {
        let mut snap = snapshot();
        snap.apply_prices([("rb1", 11.5)]);
        assert_eq!(snap.players[0].value, Some(30.0));
        assert_eq!(snap.players[1].value, Some(11.5));
    }
}
