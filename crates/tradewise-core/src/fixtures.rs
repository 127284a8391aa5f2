// Shared builders for unit tests.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};

use crate::model::{LeagueSettings, LeagueSnapshot, Player, PlayerStats, Position, Team};

/// Fixed timestamp so recomputes compare equal.
pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 14, 12, 0, 0).unwrap()
}

/// Roster slots -- single source of truth for the fixture leagues.
pub fn roster_slots() -> BTreeMap<Position, usize> {
    let mut m = BTreeMap::new();
    m.insert(Position::Quarterback, 1);
    m.insert(Position::RunningBack, 2);
    m.insert(Position::WideReceiver, 2);
    m.insert(Position::TightEnd, 1);
    m.insert(Position::Kicker, 1);
    m.insert(Position::Defense, 1);
    m
}

/// Two-team, $200 league with two bench spots and no teams or priors.
pub fn league_with(players: Vec<Player>, stats: Vec<PlayerStats>) -> LeagueSnapshot {
    LeagueSnapshot {
        league_id: "lg_test".into(),
        season: 2025,
        settings: LeagueSettings {
            num_teams: 2,
            auction_budget: 200.0,
            min_bid: 1.0,
            roster_slots: roster_slots(),
            bench_slots: 2,
        },
        players,
        stats,
        teams: vec![],
        prior_baselines: vec![],
    }
}

pub fn stats(
    id: &str,
    auction: Option<f64>,
    projected: Option<f64>,
    weekly: &[f64],
) -> PlayerStats {
    PlayerStats {
        player_id: id.to_string(),
        auction_price: auction,
        market_prior: None,
        projected_points: projected,
        weekly_points: weekly.to_vec(),
    }
}

pub fn player_with(id: &str, pos: Position, value: f64, points: Option<f64>) -> Player {
    let mut p = Player::new(id, &id.to_uppercase(), pos);
    p.value = Some(value);
    p.points = points;
    p
}

/// (id, position, auction price, projected points, recent weeks)
type Spec = (&'static str, Position, f64, f64, [f64; 4]);

const SAMPLE: &[Spec] = &[
    ("qb1", Position::Quarterback, 40.0, 22.0, [20.0, 24.0, 23.0, 25.0]),
    ("qb2", Position::Quarterback, 25.0, 18.0, [17.0, 18.0, 19.0, 18.0]),
    ("qb3", Position::Quarterback, 8.0, 14.0, [14.0, 13.0, 15.0, 14.0]),
    ("rb1", Position::RunningBack, 45.0, 18.0, [16.0, 20.0, 19.0, 22.0]),
    ("rb2", Position::RunningBack, 35.0, 15.0, [15.0, 14.0, 16.0, 15.0]),
    ("rb3", Position::RunningBack, 20.0, 12.0, [10.0, 12.0, 13.0, 11.0]),
    ("rb4", Position::RunningBack, 12.0, 10.0, [9.0, 10.0, 11.0, 10.0]),
    ("rb5", Position::RunningBack, 4.0, 7.0, [6.0, 7.0, 8.0, 6.0]),
    ("rb6", Position::RunningBack, 2.0, 5.0, [5.0, 4.0, 6.0, 5.0]),
    ("wr1", Position::WideReceiver, 38.0, 17.0, [18.0, 17.0, 16.0, 19.0]),
    ("wr2", Position::WideReceiver, 30.0, 15.0, [14.0, 15.0, 16.0, 15.0]),
    ("wr3", Position::WideReceiver, 15.0, 11.0, [10.0, 12.0, 11.0, 11.0]),
    ("wr4", Position::WideReceiver, 10.0, 9.0, [8.0, 9.0, 10.0, 9.0]),
    ("te1", Position::TightEnd, 18.0, 10.0, [9.0, 11.0, 10.0, 12.0]),
    ("te2", Position::TightEnd, 6.0, 7.0, [7.0, 6.0, 7.0, 8.0]),
    ("k1", Position::Kicker, 2.0, 8.0, [8.0, 9.0, 7.0, 8.0]),
    ("k2", Position::Kicker, 1.0, 7.0, [7.0, 7.0, 6.0, 8.0]),
    ("dst1", Position::Defense, 3.0, 8.0, [9.0, 7.0, 8.0, 10.0]),
    ("dst2", Position::Defense, 1.0, 6.0, [6.0, 5.0, 7.0, 6.0]),
];

/// A small two-team league. "t1" is deep at QB and thin at RB; "t2" is the
/// reverse. rb6 is a free agent, and rb5/rb6 sit below RB replacement.
/// Player values start at their auction prices.
pub fn sample_league() -> LeagueSnapshot {
    let players = SAMPLE
        .iter()
        .map(|&(id, pos, auction, _, _)| {
            let mut p = Player::new(id, &format!("Player {}", id.to_uppercase()), pos);
            p.value = Some(auction);
            p
        })
        .collect();
    let stats = SAMPLE
        .iter()
        .map(|(id, _, auction, projected, weekly)| stats(id, Some(*auction), Some(*projected), weekly))
        .collect();

    let mut snap = league_with(players, stats);
    snap.teams = vec![
        team(
            "t1",
            "Gridiron Kings",
            &["qb1", "qb2", "rb3", "rb4", "wr1", "wr3", "te1", "k1", "dst1"],
        ),
        team(
            "t2",
            "Blitz Brigade",
            &["qb3", "rb1", "rb2", "rb5", "wr2", "wr4", "te2", "k2", "dst2"],
        ),
    ];
    snap.hydrate_points();
    snap
}

pub fn team(id: &str, name: &str, roster: &[&str]) -> Team {
    Team {
        id: id.to_string(),
        name: name.to_string(),
        roster: roster.iter().map(|s| s.to_string()).collect(),
    }
}
