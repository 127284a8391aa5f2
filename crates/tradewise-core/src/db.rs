// SQLite persistence for leagues, valuations, baselines, and proposals.

use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::model::{
    LeagueSettings, LeagueSnapshot, Player, PlayerStats, Position, ReplacementBaseline, Team,
};
use crate::repository::LeagueRepository;
use crate::trade::{ProposalStatus, StatusEvent, TradeProposal};
use crate::valuation::{LeagueValuations, PriceComponents, Valuation};

/// SQLite-backed [`LeagueRepository`].
pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS leagues (
                id       TEXT PRIMARY KEY,
                season   INTEGER NOT NULL,
                settings TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS teams (
                league_id TEXT NOT NULL REFERENCES leagues(id),
                id        TEXT NOT NULL,
                name      TEXT NOT NULL,
                PRIMARY KEY (league_id, id)
            );

            CREATE TABLE IF NOT EXISTS players (
                league_id TEXT NOT NULL REFERENCES leagues(id),
                id        TEXT NOT NULL,
                name      TEXT NOT NULL,
                position  TEXT NOT NULL,
                nfl_team  TEXT,
                value     REAL,
                points    REAL,
                PRIMARY KEY (league_id, id)
            );

            CREATE TABLE IF NOT EXISTS roster (
                league_id  TEXT NOT NULL,
                team_id    TEXT NOT NULL,
                player_id  TEXT NOT NULL,
                slot_order INTEGER NOT NULL,
                PRIMARY KEY (league_id, player_id),
                FOREIGN KEY (league_id, team_id) REFERENCES teams(league_id, id),
                FOREIGN KEY (league_id, player_id) REFERENCES players(league_id, id)
            );

            CREATE TABLE IF NOT EXISTS player_stats (
                league_id        TEXT NOT NULL,
                player_id        TEXT NOT NULL,
                auction_price    REAL,
                market_prior     REAL,
                projected_points REAL,
                weekly_points    TEXT NOT NULL,
                PRIMARY KEY (league_id, player_id),
                FOREIGN KEY (league_id, player_id) REFERENCES players(league_id, id)
            );

            CREATE TABLE IF NOT EXISTS valuations (
                league_id      TEXT NOT NULL,
                player_id      TEXT NOT NULL,
                engine_version TEXT NOT NULL,
                ts             TEXT NOT NULL,
                price          REAL NOT NULL,
                anchor         REAL NOT NULL,
                delta_perf     REAL NOT NULL,
                vorp           REAL NOT NULL,
                global_adj     REAL NOT NULL,
                PRIMARY KEY (league_id, player_id, engine_version, ts)
            );

            CREATE TABLE IF NOT EXISTS replacement_baselines (
                league_id      TEXT NOT NULL,
                season         INTEGER NOT NULL,
                position       TEXT NOT NULL,
                points         REAL NOT NULL,
                engine_version TEXT NOT NULL,
                computed_at    TEXT NOT NULL,
                PRIMARY KEY (league_id, season, position)
            );

            CREATE TABLE IF NOT EXISTS trade_proposals (
                league_id  TEXT NOT NULL,
                id         TEXT NOT NULL,
                from_team  TEXT NOT NULL,
                to_team    TEXT NOT NULL,
                status     TEXT NOT NULL,
                created_at TEXT NOT NULL,
                body       TEXT NOT NULL,
                PRIMARY KEY (league_id, id)
            );

            CREATE TABLE IF NOT EXISTS proposal_events (
                seq         INTEGER PRIMARY KEY AUTOINCREMENT,
                league_id   TEXT NOT NULL,
                proposal_id TEXT NOT NULL,
                from_status TEXT NOT NULL,
                to_status   TEXT NOT NULL,
                at          TEXT NOT NULL,
                FOREIGN KEY (league_id, proposal_id) REFERENCES trade_proposals(league_id, id)
            );
            ",
        )
        .context("failed to create database schema")?;

        conn.execute_batch(
            "CREATE INDEX IF NOT EXISTS idx_valuations_latest
                 ON valuations(league_id, player_id, ts);",
        )
        .context("failed to create valuations index")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock).
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Replace a league's settings, teams, players, rosters, and stats with
    /// the contents of `snapshot`, in a single transaction. Valuation
    /// history is kept; `prior_baselines` are upserted.
    pub fn import_league(&self, snapshot: &LeagueSnapshot) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin import transaction")?;
        let league = snapshot.league_id.as_str();

        let settings_json = serde_json::to_string(&snapshot.settings)
            .context("failed to serialize league settings")?;
        tx.execute(
            "INSERT INTO leagues (id, season, settings) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                season   = excluded.season,
                settings = excluded.settings",
            params![league, snapshot.season, settings_json],
        )
        .context("failed to upsert league")?;

        for table in ["roster", "player_stats", "players", "teams"] {
            tx.execute(
                &format!("DELETE FROM {table} WHERE league_id = ?1"),
                params![league],
            )
            .with_context(|| format!("failed to clear {table}"))?;
        }

        for team in &snapshot.teams {
            tx.execute(
                "INSERT INTO teams (league_id, id, name) VALUES (?1, ?2, ?3)",
                params![league, team.id, team.name],
            )
            .with_context(|| format!("failed to insert team {}", team.id))?;
        }

        for p in &snapshot.players {
            tx.execute(
                "INSERT INTO players (league_id, id, name, position, nfl_team, value, points)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    league,
                    p.id,
                    p.name,
                    p.position.display_str(),
                    p.nfl_team,
                    p.value,
                    p.points,
                ],
            )
            .with_context(|| format!("failed to insert player {}", p.id))?;
        }

        for team in &snapshot.teams {
            for (order, player_id) in team.roster.iter().enumerate() {
                tx.execute(
                    "INSERT INTO roster (league_id, team_id, player_id, slot_order)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![league, team.id, player_id, order as i64],
                )
                .with_context(|| format!("failed to roster {player_id} on {}", team.id))?;
            }
        }

        for s in &snapshot.stats {
            let weekly = serde_json::to_string(&s.weekly_points)
                .context("failed to serialize weekly points")?;
            tx.execute(
                "INSERT INTO player_stats
                    (league_id, player_id, auction_price, market_prior, projected_points, weekly_points)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    league,
                    s.player_id,
                    s.auction_price,
                    s.market_prior,
                    s.projected_points,
                    weekly,
                ],
            )
            .with_context(|| format!("failed to insert stats for {}", s.player_id))?;
        }

        for b in &snapshot.prior_baselines {
            upsert_baseline(&tx, league, b)?;
        }

        tx.commit().context("failed to commit league import")?;
        Ok(())
    }

    fn load_players(conn: &Connection, league_id: &str) -> Result<Vec<Player>> {
        let mut stmt = conn
            .prepare(
                "SELECT id, name, position, nfl_team, value, points
                 FROM players WHERE league_id = ?1 ORDER BY id",
            )
            .context("failed to prepare players query")?;
        let rows = stmt
            .query_map(params![league_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<f64>>(4)?,
                    row.get::<_, Option<f64>>(5)?,
                ))
            })
            .context("failed to query players")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map player rows")?;

        rows.into_iter()
            .map(|(id, name, position, nfl_team, value, points)| {
                Ok(Player {
                    position: parse_position(&position)?,
                    id,
                    name,
                    nfl_team,
                    value,
                    points,
                })
            })
            .collect()
    }

    fn load_stats(conn: &Connection, league_id: &str) -> Result<Vec<PlayerStats>> {
        let mut stmt = conn
            .prepare(
                "SELECT player_id, auction_price, market_prior, projected_points, weekly_points
                 FROM player_stats WHERE league_id = ?1 ORDER BY player_id",
            )
            .context("failed to prepare stats query")?;
        let rows = stmt
            .query_map(params![league_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<f64>>(1)?,
                    row.get::<_, Option<f64>>(2)?,
                    row.get::<_, Option<f64>>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })
            .context("failed to query player stats")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map player stats rows")?;

        rows.into_iter()
            .map(|(player_id, auction_price, market_prior, projected_points, weekly)| {
                let weekly_points = serde_json::from_str(&weekly)
                    .with_context(|| format!("bad weekly points for {player_id}"))?;
                Ok(PlayerStats {
                    player_id,
                    auction_price,
                    market_prior,
                    projected_points,
                    weekly_points,
                })
            })
            .collect()
    }

    fn load_teams(conn: &Connection, league_id: &str) -> Result<Vec<Team>> {
        let mut stmt = conn
            .prepare("SELECT id, name FROM teams WHERE league_id = ?1 ORDER BY id")
            .context("failed to prepare teams query")?;
        let mut teams = stmt
            .query_map(params![league_id], |row| {
                Ok(Team {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    roster: Vec::new(),
                })
            })
            .context("failed to query teams")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map team rows")?;

        let mut stmt = conn
            .prepare(
                "SELECT team_id, player_id FROM roster
                 WHERE league_id = ?1 ORDER BY team_id, slot_order",
            )
            .context("failed to prepare roster query")?;
        let slots = stmt
            .query_map(params![league_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .context("failed to query roster")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map roster rows")?;

        for (team_id, player_id) in slots {
            if let Some(team) = teams.iter_mut().find(|t| t.id == team_id) {
                team.roster.push(player_id);
            }
        }
        Ok(teams)
    }

    fn load_baselines(conn: &Connection, league_id: &str) -> Result<Vec<ReplacementBaseline>> {
        let mut stmt = conn
            .prepare(
                "SELECT season, position, points, engine_version, computed_at
                 FROM replacement_baselines WHERE league_id = ?1 ORDER BY season, position",
            )
            .context("failed to prepare baselines query")?;
        let rows = stmt
            .query_map(params![league_id], |row| {
                Ok((
                    row.get::<_, u16>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })
            .context("failed to query baselines")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map baseline rows")?;

        rows.into_iter()
            .map(|(season, position, points, engine_version, computed_at)| {
                Ok(ReplacementBaseline {
                    season,
                    position: parse_position(&position)?,
                    points,
                    engine_version,
                    computed_at: parse_ts(&computed_at)?,
                })
            })
            .collect()
    }
}

impl LeagueRepository for SqliteRepository {
    fn load_league(&self, league_id: &str) -> Result<Option<LeagueSnapshot>> {
        let conn = self.conn();
        let header: Option<(u16, String)> = conn
            .query_row(
                "SELECT season, settings FROM leagues WHERE id = ?1",
                params![league_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .context("failed to query league")?;
        let Some((season, settings_json)) = header else {
            return Ok(None);
        };
        let settings: LeagueSettings = serde_json::from_str(&settings_json)
            .with_context(|| format!("bad settings for league {league_id}"))?;

        Ok(Some(LeagueSnapshot {
            league_id: league_id.to_string(),
            season,
            settings,
            players: Self::load_players(&conn, league_id)?,
            stats: Self::load_stats(&conn, league_id)?,
            teams: Self::load_teams(&conn, league_id)?,
            prior_baselines: Self::load_baselines(&conn, league_id)?,
        }))
    }

    fn save_valuations(&self, batch: &LeagueValuations) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .context("failed to begin valuations transaction")?;

        for v in &batch.valuations {
            let c = v.components;
            tx.execute(
                "INSERT OR REPLACE INTO valuations
                    (league_id, player_id, engine_version, ts, price, anchor, delta_perf, vorp, global_adj)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    v.league_id,
                    v.player_id,
                    v.engine_version,
                    format_ts(v.ts),
                    v.price,
                    c.anchor,
                    c.delta_perf,
                    c.vorp,
                    c.global,
                ],
            )
            .with_context(|| format!("failed to insert valuation for {}", v.player_id))?;
        }

        for b in &batch.baselines {
            upsert_baseline(&tx, &batch.league_id, b)?;
        }

        tx.commit().context("failed to commit valuations")?;
        Ok(())
    }

    fn latest_valuations(&self, league_id: &str) -> Result<Vec<Valuation>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT v.player_id, v.engine_version, v.ts, v.price,
                        v.anchor, v.delta_perf, v.vorp, v.global_adj
                 FROM valuations v
                 WHERE v.league_id = ?1
                   AND v.ts = (SELECT MAX(w.ts) FROM valuations w
                               WHERE w.league_id = v.league_id AND w.player_id = v.player_id)
                 ORDER BY v.player_id, v.engine_version",
            )
            .context("failed to prepare latest valuations query")?;
        let rows = stmt
            .query_map(params![league_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, f64>(3)?,
                    PriceComponents {
                        anchor: row.get(4)?,
                        delta_perf: row.get(5)?,
                        vorp: row.get(6)?,
                        global: row.get(7)?,
                    },
                ))
            })
            .context("failed to query latest valuations")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map valuation rows")?;

        let mut out: Vec<Valuation> = Vec::with_capacity(rows.len());
        for (player_id, engine_version, ts, price, components) in rows {
            // Two engine versions stamped in the same instant: keep one.
            if out.last().is_some_and(|v| v.player_id == player_id) {
                continue;
            }
            out.push(Valuation {
                league_id: league_id.to_string(),
                player_id,
                price,
                components,
                ts: parse_ts(&ts)?,
                engine_version,
            });
        }
        Ok(out)
    }

    fn save_proposal(&self, league_id: &str, proposal: &TradeProposal) -> Result<()> {
        let conn = self.conn();
        let body = serde_json::to_string(proposal).context("failed to serialize proposal")?;
        conn.execute(
            "INSERT INTO trade_proposals
                (league_id, id, from_team, to_team, status, created_at, body)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(league_id, id) DO UPDATE SET
                body       = excluded.body,
                created_at = excluded.created_at",
            params![
                league_id,
                proposal.id,
                proposal.from_team,
                proposal.to_team,
                proposal.status.label(),
                format_ts(proposal.created_at),
                body,
            ],
        )
        .with_context(|| format!("failed to save proposal {}", proposal.id))?;
        Ok(())
    }

    fn load_proposal(&self, league_id: &str, proposal_id: &str) -> Result<Option<TradeProposal>> {
        let conn = self.conn();
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT status, body FROM trade_proposals WHERE league_id = ?1 AND id = ?2",
                params![league_id, proposal_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .context("failed to query proposal")?;
        let Some((status, body)) = row else {
            return Ok(None);
        };

        let mut proposal: TradeProposal = serde_json::from_str(&body)
            .with_context(|| format!("bad stored proposal {proposal_id}"))?;
        proposal.status = ProposalStatus::from_label(&status)
            .ok_or_else(|| anyhow!("unknown proposal status '{status}'"))?;
        Ok(Some(proposal))
    }

    fn record_status_event(&self, league_id: &str, event: &StatusEvent) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .context("failed to begin status transaction")?;

        let changed = tx
            .execute(
                "UPDATE trade_proposals SET status = ?1
                 WHERE league_id = ?2 AND id = ?3 AND status = ?4",
                params![
                    event.to.label(),
                    league_id,
                    event.proposal_id,
                    event.from.label(),
                ],
            )
            .context("failed to update proposal status")?;
        if changed == 0 {
            bail!(
                "proposal {} is not in status {} (concurrent update?)",
                event.proposal_id,
                event.from
            );
        }

        tx.execute(
            "INSERT INTO proposal_events (league_id, proposal_id, from_status, to_status, at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                league_id,
                event.proposal_id,
                event.from.label(),
                event.to.label(),
                format_ts(event.at),
            ],
        )
        .context("failed to insert status event")?;

        tx.commit().context("failed to commit status event")?;
        Ok(())
    }

    fn status_events(&self, league_id: &str, proposal_id: &str) -> Result<Vec<StatusEvent>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT from_status, to_status, at FROM proposal_events
                 WHERE league_id = ?1 AND proposal_id = ?2 ORDER BY seq",
            )
            .context("failed to prepare status events query")?;
        let rows = stmt
            .query_map(params![league_id, proposal_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .context("failed to query status events")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map status event rows")?;

        rows.into_iter()
            .map(|(from, to, at)| {
                Ok(StatusEvent {
                    proposal_id: proposal_id.to_string(),
                    from: parse_status(&from)?,
                    to: parse_status(&to)?,
                    at: parse_ts(&at)?,
                })
            })
            .collect()
    }
}

fn upsert_baseline(conn: &Connection, league_id: &str, b: &ReplacementBaseline) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO replacement_baselines
            (league_id, season, position, points, engine_version, computed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            league_id,
            b.season,
            b.position.display_str(),
            b.points,
            b.engine_version,
            format_ts(b.computed_at),
        ],
    )
    .with_context(|| format!("failed to upsert {} baseline", b.position))?;
    Ok(())
}

/// Fixed-width RFC 3339 so text order matches time order.
fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("bad timestamp '{s}'"))?
        .with_timezone(&Utc))
}

fn parse_position(s: &str) -> Result<Position> {
    Position::from_str_pos(s).ok_or_else(|| anyhow!("unknown position '{s}'"))
}

fn parse_status(s: &str) -> Result<ProposalStatus> {
    ProposalStatus::from_label(s).ok_or_else(|| anyhow!("unknown proposal status '{s}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::config::EngineConfig;
    use crate::fixtures::{fixed_time, sample_league};
    use crate::trade::evaluator::{NeedDelta, SidePair};
    use crate::trade::{Direction, GenerationMode, TradeItem};
    use crate::valuation::compute_league_valuations;

    /// Helper: create a fresh in-memory database for each test.
    fn test_db() -> SqliteRepository {
        SqliteRepository::open(":memory:").expect("in-memory database should open")
    }

    fn seeded_db() -> SqliteRepository {
        let db = test_db();
        db.import_league(&sample_league()).unwrap();
        db
    }

    fn sample_proposal() -> TradeProposal {
        let items = vec![
            TradeItem {
                direction: Direction::Give,
                player_id: "qb2".into(),
                player_name: "Player QB2".into(),
                position: Position::Quarterback,
                value: 25.0,
            },
            TradeItem {
                direction: Direction::Get,
                player_id: "rb2".into(),
                player_name: "Player RB2".into(),
                position: Position::RunningBack,
                value: 35.0,
            },
        ];
        TradeProposal {
            id: TradeProposal::make_id("t1", "t2", &items),
            from_team: "t1".into(),
            to_team: "t2".into(),
            to_team_name: "Blitz Brigade".into(),
            items,
            value_delta: SidePair {
                team_a: 10.0,
                team_b: -10.0,
            },
            need_delta: SidePair {
                team_a: NeedDelta::default(),
                team_b: NeedDelta::default(),
            },
            fairness_score: 0.62,
            rationale: "value".into(),
            generation_mode: GenerationMode::Balanced,
            status: ProposalStatus::Draft,
            created_at: fixed_time(),
        }
    }

    #[test]
    fn open_creates_tables() {
        let db = test_db();
        let conn = db.conn();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('leagues', 'teams', 'players', 'roster', 'player_stats',
                              'valuations', 'replacement_baselines', 'trade_proposals',
                              'proposal_events')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 9);
    }

    #[test]
    fn unknown_league_loads_as_none() {
        assert!(test_db().load_league("missing").unwrap().is_none());
    }

    #[test]
    fn import_and_load_round_trip() {
        let original = sample_league();
        let db = test_db();
        db.import_league(&original).unwrap();
        let loaded = db.load_league(&original.league_id).unwrap().unwrap();

        assert_eq!(loaded.season, original.season);
        assert_eq!(loaded.settings, original.settings);
        assert_eq!(loaded.players.len(), original.players.len());
        assert_eq!(loaded.stats.len(), original.stats.len());
        assert_eq!(loaded.team("t1").unwrap().roster, original.team("t1").unwrap().roster);
        assert_eq!(loaded.player("rb1"), original.player("rb1"));
        assert_eq!(loaded.stats_for("wr2"), original.stats_for("wr2"));
    }

    #[test]
    fn reimport_replaces_rosters() {
        let mut snap = sample_league();
        let db = test_db();
        db.import_league(&snap).unwrap();

        snap.teams[0].roster.retain(|id| id != "qb2");
        db.import_league(&snap).unwrap();
        let loaded = db.load_league(&snap.league_id).unwrap().unwrap();
        assert!(!loaded.team("t1").unwrap().roster.contains(&"qb2".to_string()));
    }

    #[test]
    fn latest_valuations_pick_newest_batch() {
        let db = seeded_db();
        let snap = sample_league();
        let config = EngineConfig::default();

        let older = compute_league_valuations(&snap, &config, fixed_time());
        let mut tweaked = snap.clone();
        if let Some(s) = tweaked.stats.iter_mut().find(|s| s.player_id == "rb1") {
            s.auction_price = Some(60.0);
        }
        let newer = compute_league_valuations(&tweaked, &config, fixed_time() + Duration::hours(1));

        db.save_valuations(&newer).unwrap();
        db.save_valuations(&older).unwrap();

        let latest = db.latest_valuations(&snap.league_id).unwrap();
        assert_eq!(latest.len(), snap.players.len());
        assert!(latest.iter().all(|v| v.ts == newer.computed_at));
        assert_eq!(latest, newer.valuations);
    }

    #[test]
    fn saving_the_same_batch_twice_is_idempotent() {
        let db = seeded_db();
        let snap = sample_league();
        let batch = compute_league_valuations(&snap, &EngineConfig::default(), fixed_time());
        db.save_valuations(&batch).unwrap();
        db.save_valuations(&batch).unwrap();

        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM valuations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count as usize, snap.players.len());
    }

    #[test]
    fn baselines_come_back_as_priors() {
        let db = seeded_db();
        let snap = sample_league();
        let batch = compute_league_valuations(&snap, &EngineConfig::default(), fixed_time());
        assert!(!batch.baselines.is_empty());
        db.save_valuations(&batch).unwrap();

        let loaded = db.load_league(&snap.league_id).unwrap().unwrap();
        assert_eq!(loaded.prior_baselines.len(), batch.baselines.len());
        let rb = batch
            .baselines
            .iter()
            .find(|b| b.position == Position::RunningBack)
            .map(|b| b.points);
        assert_eq!(loaded.prior_baseline(Position::RunningBack), rb);
    }

    #[test]
    fn proposal_round_trip_and_status_events() {
        let db = seeded_db();
        let mut proposal = sample_proposal();
        db.save_proposal("lg_test", &proposal).unwrap();

        let loaded = db.load_proposal("lg_test", &proposal.id).unwrap().unwrap();
        assert_eq!(loaded, proposal);

        let event = proposal
            .transition(ProposalStatus::Sent, fixed_time())
            .unwrap();
        db.record_status_event("lg_test", &event).unwrap();

        let loaded = db.load_proposal("lg_test", &proposal.id).unwrap().unwrap();
        assert_eq!(loaded.status, ProposalStatus::Sent);
        assert_eq!(db.status_events("lg_test", &proposal.id).unwrap(), vec![event]);
    }

    #[test]
    fn stale_status_event_is_rejected() {
        let db = seeded_db();
        let proposal = sample_proposal();
        db.save_proposal("lg_test", &proposal).unwrap();

        let stale = StatusEvent {
            proposal_id: proposal.id.clone(),
            from: ProposalStatus::Sent,
            to: ProposalStatus::Accepted,
            at: fixed_time(),
        };
        assert!(db.record_status_event("lg_test", &stale).is_err());
        assert!(db.status_events("lg_test", &proposal.id).unwrap().is_empty());
    }

    #[test]
    fn resaving_a_proposal_keeps_its_status() {
        let db = seeded_db();
        let mut proposal = sample_proposal();
        db.save_proposal("lg_test", &proposal).unwrap();
        let event = proposal
            .transition(ProposalStatus::Sent, fixed_time())
            .unwrap();
        db.record_status_event("lg_test", &event).unwrap();

        db.save_proposal("lg_test", &sample_proposal()).unwrap();
        let loaded = db.load_proposal("lg_test", &proposal.id).unwrap().unwrap();
        assert_eq!(loaded.status, ProposalStatus::Sent);
    }

    #[test]
    fn foreign_keys_enforced() {
        let db = test_db();
        let result = db.conn().execute(
            "INSERT INTO teams (league_id, id, name) VALUES ('nope', 't1', 'Orphans')",
            [],
        );
        assert!(result.is_err(), "team without a league should be rejected");
    }

    #[test]
    fn timestamps_sort_as_text() {
        let early = format_ts(fixed_time());
        let late = format_ts(fixed_time() + Duration::milliseconds(5));
        assert!(early < late);
        assert_eq!(parse_ts(&early).unwrap(), fixed_time());
    }
}
