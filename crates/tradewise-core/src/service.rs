// Service facade: loads league data through a repository, runs the engine,
// and shapes results for callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{EngineError, EntityKind};
use crate::model::{LeagueSnapshot, Player};
use crate::repository::LeagueRepository;
use crate::trade::{
    evaluate_trade, generate_trade_proposals, GenerationRequest, GenerationResult,
    ProposalStatus, TradeEvaluation, TradeProposal, TradeRequest, TradeSide, TradeTeams,
};
use crate::valuation::{compute_league_valuations, LeagueValuations};
use crate::weakness::{calculate_team_weakness, NeedModel, WeaknessItem};

/// One side of a trade named by player ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamTradeSide {
    pub team_id: String,
    #[serde(default)]
    pub gives: Vec<String>,
    #[serde(default)]
    pub gets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeByIds {
    pub team_a: TeamTradeSide,
    pub team_b: TeamTradeSide,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaknessMeta {
    pub league_id: String,
    pub team_id: String,
    pub team_name: String,
    pub engine_version: String,
    pub computed_at: DateTime<Utc>,
}

/// Weakness endpoint payload: `{needScore, items, meta}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaknessReport {
    pub need_score: f64,
    pub items: Vec<WeaknessItem>,
    pub meta: WeaknessMeta,
}

/// Engine entry points over a league repository.
pub struct TradeAssistant<R> {
    repo: R,
    config: EngineConfig,
}

impl<R: LeagueRepository> TradeAssistant<R> {
    pub fn new(repo: R, config: EngineConfig) -> Self {
        TradeAssistant { repo, config }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Recompute every player's price, stamped with the current time.
    pub fn compute_league_valuations(&self, league_id: &str) -> Result<LeagueValuations, EngineError> {
        self.compute_league_valuations_at(league_id, Utc::now())
    }

    /// Recompute every player's price with an explicit timestamp. Identical
    /// stored data and timestamp give an identical batch.
    pub fn compute_league_valuations_at(
        &self,
        league_id: &str,
        computed_at: DateTime<Utc>,
    ) -> Result<LeagueValuations, EngineError> {
        let snapshot = self.load(league_id)?;
        Ok(compute_league_valuations(&snapshot, &self.config, computed_at))
    }

    /// Persist a recompute batch atomically.
    pub fn save_valuations(&self, batch: &LeagueValuations) -> Result<(), EngineError> {
        self.repo.save_valuations(batch)?;
        info!(
            league = %batch.league_id,
            valuations = batch.valuations.len(),
            baselines = batch.baselines.len(),
            "valuations saved"
        );
        Ok(())
    }

    pub fn calculate_team_weakness(
        &self,
        league_id: &str,
        team_id: &str,
    ) -> Result<WeaknessReport, EngineError> {
        self.calculate_team_weakness_at(league_id, team_id, Utc::now())
    }

    /// Score a team's weakness, stamping the report with `computed_at`.
    /// Identical stored data and timestamp give an identical report.
    pub fn calculate_team_weakness_at(
        &self,
        league_id: &str,
        team_id: &str,
        computed_at: DateTime<Utc>,
    ) -> Result<WeaknessReport, EngineError> {
        let snapshot = self.priced(league_id)?;
        let team = snapshot.team(team_id)?;
        let roster = snapshot.team_roster(team_id)?;
        let model = NeedModel::from_league(&snapshot, &self.config.need);
        let weakness = calculate_team_weakness(&roster, &model);

        debug!(
            league = league_id,
            team = team_id,
            need_score = weakness.need_score,
            "team weakness scored"
        );

        Ok(WeaknessReport {
            need_score: weakness.need_score,
            items: weakness.items,
            meta: WeaknessMeta {
                league_id: league_id.to_string(),
                team_id: team.id.clone(),
                team_name: team.name.clone(),
                engine_version: self.config.version.clone(),
                computed_at,
            },
        })
    }

    /// Evaluate a trade named by team and player ids, using current prices
    /// and rosters. Both sides must be different teams.
    pub fn evaluate_trade(
        &self,
        league_id: &str,
        trade: &TradeByIds,
    ) -> Result<TradeEvaluation, EngineError> {
        if trade.team_a.team_id == trade.team_b.team_id {
            return Err(EngineError::malformed(format!(
                "team {} cannot trade with itself",
                trade.team_a.team_id
            )));
        }
        let snapshot = self.priced(league_id)?;
        let team_a = snapshot.team(&trade.team_a.team_id)?;
        let team_b = snapshot.team(&trade.team_b.team_id)?;
        let roster_a = snapshot.team_roster(&team_a.id)?;
        let roster_b = snapshot.team_roster(&team_b.id)?;
        let model = NeedModel::from_league(&snapshot, &self.config.need);

        let request = TradeRequest {
            team_a: resolve_side(&snapshot, &trade.team_a)?,
            team_b: resolve_side(&snapshot, &trade.team_b)?,
        };
        let teams = TradeTeams {
            name_a: &team_a.name,
            name_b: &team_b.name,
            roster_a: &roster_a,
            roster_b: &roster_b,
            model: &model,
        };
        evaluate_trade(&request, Some(&teams), &self.config.trade)
    }

    pub fn generate_trade_proposals(
        &self,
        league_id: &str,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, EngineError> {
        let snapshot = self.priced(league_id)?;
        let model = NeedModel::from_league(&snapshot, &self.config.need);
        generate_trade_proposals(&snapshot, &model, request, &self.config.trade, Utc::now())
    }

    pub fn save_proposal(&self, league_id: &str, proposal: &TradeProposal) -> Result<(), EngineError> {
        self.repo.save_proposal(league_id, proposal)?;
        Ok(())
    }

    /// Move a stored proposal to `next` and record the event.
    pub fn transition_proposal(
        &self,
        league_id: &str,
        proposal_id: &str,
        next: ProposalStatus,
    ) -> Result<TradeProposal, EngineError> {
        let mut proposal = self
            .repo
            .load_proposal(league_id, proposal_id)?
            .ok_or_else(|| EngineError::not_found(EntityKind::Proposal, proposal_id))?;
        let event = proposal.transition(next, Utc::now())?;
        self.repo.record_status_event(league_id, &event)?;
        info!(
            league = league_id,
            proposal = proposal_id,
            from = %event.from,
            to = %event.to,
            "proposal status changed"
        );
        Ok(proposal)
    }

    fn load(&self, league_id: &str) -> Result<LeagueSnapshot, EngineError> {
        self.repo
            .load_league(league_id)?
            .ok_or_else(|| EngineError::not_found(EntityKind::League, league_id))
    }

    /// Snapshot with the latest stored prices applied and per-week points
    /// filled in. Without stored valuations, prices are computed on the fly
    /// and not saved.
    fn priced(&self, league_id: &str) -> Result<LeagueSnapshot, EngineError> {
        let mut snapshot = self.load(league_id)?;
        let latest = self.repo.latest_valuations(league_id)?;
        if latest.is_empty() {
            debug!(league = league_id, "no stored valuations; pricing on the fly");
            let batch = compute_league_valuations(&snapshot, &self.config, Utc::now());
            snapshot.apply_prices(
                batch
                    .valuations
                    .iter()
                    .map(|v| (v.player_id.as_str(), v.price)),
            );
        } else {
            snapshot.apply_prices(latest.iter().map(|v| (v.player_id.as_str(), v.price)));
        }
        snapshot.hydrate_points();
        Ok(snapshot)
    }
}

fn resolve_side(snapshot: &LeagueSnapshot, side: &TeamTradeSide) -> Result<TradeSide, EngineError> {
    Ok(TradeSide {
        gives: resolve_players(snapshot, &side.gives)?,
        gets: resolve_players(snapshot, &side.gets)?,
    })
}

fn resolve_players(snapshot: &LeagueSnapshot, ids: &[String]) -> Result<Vec<Player>, EngineError> {
    ids.iter()
        .map(|id| {
            snapshot
                .player(id)
                .cloned()
                .ok_or_else(|| EngineError::not_found(EntityKind::Player, id.clone()))
        })
        .collect()
}
