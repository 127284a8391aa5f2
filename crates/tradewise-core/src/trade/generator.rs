// Trade proposal search.
//
// Enumerates small packages between the proposing team and its partners,
// scores each with the evaluator, keeps the ones the mode allows, and ranks
// what is left. The search is bounded twice: each side's candidate pool is
// capped, and so is the number of candidates evaluated. The evaluation cap is
// split across every shape and partner so no package shape is starved.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::evaluator::{evaluate_trade, TradeEvaluation, TradeRequest, TradeSide, TradeTeams};
use super::proposal::{Direction, GenerationMode, ProposalStatus, TradeItem, TradeProposal};
use crate::config::TradeConfig;
use crate::error::{EngineError, EntityKind};
use crate::model::{LeagueSnapshot, Player, Team};
use crate::weakness::NeedModel;

/// Package shapes searched, as (players given, players received), in search
/// order.
pub const SHAPES: [(usize, usize); 3] = [(1, 1), (2, 1), (1, 2)];

/// Slack for comparing rounded deltas against roster-value tolerances.
const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub from_team_id: String,
    /// Restrict the search to one partner; all other teams when absent.
    #[serde(default)]
    pub to_team_id: Option<String>,
    /// Players the proposing team wants. Empty means any partner player.
    #[serde(default)]
    pub targets: Vec<String>,
    /// Players the proposing team will part with. Empty means its full roster.
    #[serde(default)]
    pub sendables: Vec<String>,
    #[serde(default)]
    pub mode: GenerationMode,
    /// Overrides the configured result cap.
    #[serde(default)]
    pub max_results: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMeta {
    pub from_team_id: String,
    pub mode: GenerationMode,
    pub partners_searched: usize,
    pub candidates_evaluated: usize,
    pub candidates_accepted: usize,
    /// True when the candidate cap stopped the search early.
    pub truncated: bool,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub proposals: Vec<TradeProposal>,
    pub meta: GenerationMeta,
}

struct Partner<'a> {
    team: &'a Team,
    roster: Vec<Player>,
    roster_value: f64,
    pool: Vec<Player>,
}

struct Search<'a> {
    from: &'a Team,
    from_roster: &'a [Player],
    from_value: f64,
    model: &'a NeedModel,
    config: &'a TradeConfig,
    mode: GenerationMode,
    generated_at: DateTime<Utc>,
    evaluated: usize,
    truncated: bool,
    accepted: Vec<TradeProposal>,
}

/// Search for trades between `request.from_team_id` and its partners.
///
/// Ranking is stable: closeness of the fairness score to 0.5 first, then
/// combined need improvement (larger first), then partner id, then proposal
/// id. Every returned proposal satisfies the mode's constraints.
pub fn generate_trade_proposals(
    snapshot: &LeagueSnapshot,
    model: &NeedModel,
    request: &GenerationRequest,
    config: &TradeConfig,
    generated_at: DateTime<Utc>,
) -> Result<GenerationResult, EngineError> {
    let from = snapshot.team(&request.from_team_id)?;
    let from_roster = snapshot.team_roster(&from.id)?;

    let max_results = match request.max_results {
        Some(0) => return Err(EngineError::malformed("maxResults must be at least 1")),
        Some(n) => n,
        None => config.max_results,
    };

    let partner_teams: Vec<&Team> = match request.to_team_id.as_deref() {
        Some(to) if to == from.id => {
            return Err(EngineError::malformed("cannot propose a trade to the same team"));
        }
        Some(to) => vec![snapshot.team(to)?],
        None => {
            let mut others: Vec<&Team> =
                snapshot.teams.iter().filter(|t| t.id != from.id).collect();
            others.sort_by(|a, b| a.id.cmp(&b.id));
            others
        }
    };

    let give_pool = cap_pool(select(&from_roster, &request.sendables)?, config.max_pool_size);
    let targets = target_set(snapshot, &from.id, &partner_teams, &request.targets)?;

    let mut partners = Vec::new();
    for team in partner_teams {
        let roster = snapshot.team_roster(&team.id)?;
        let eligible: Vec<Player> = match &targets {
            Some(ids) => roster.iter().filter(|p| ids.contains(p.id.as_str())).cloned().collect(),
            None => roster.clone(),
        };
        if eligible.is_empty() {
            continue;
        }
        partners.push(Partner {
            team,
            roster_value: roster.iter().map(Player::value_or_zero).sum(),
            roster,
            pool: cap_pool(eligible, config.max_pool_size),
        });
    }

    let mut search = Search {
        from,
        from_roster: &from_roster,
        from_value: from_roster.iter().map(Player::value_or_zero).sum(),
        model,
        config,
        mode: request.mode,
        generated_at,
        evaluated: 0,
        truncated: false,
        accepted: Vec::new(),
    };

    // Each shape gets an equal share of the candidate cap, and each partner an
    // equal share of its shape's budget. Unused budget carries forward.
    let mut remaining = config.max_candidates;
    for (shape_index, (give_size, get_size)) in SHAPES.into_iter().enumerate() {
        let gives = packages(&give_pool, give_size);
        let shape_budget = remaining / (SHAPES.len() - shape_index);
        remaining -= shape_budget;
        let mut shape_left = shape_budget;

        for (partner_index, partner) in partners.iter().enumerate() {
            let cell_budget = shape_left / (partners.len() - partner_index);
            let gets = packages(&partner.pool, get_size);
            let used = search.search_cell(partner, closest_first(&gives, &gets), cell_budget)?;
            shape_left -= used;
            debug!(
                partner = %partner.team.id,
                shape = %format!("{give_size}-for-{get_size}"),
                budget = cell_budget,
                evaluated = used,
                "partner searched"
            );
        }
        remaining += shape_left;
    }

    let Search {
        mut accepted,
        evaluated,
        truncated,
        ..
    } = search;
    let candidates_accepted = accepted.len();

    accepted.sort_by(|a, b| {
        let fa = (a.fairness_score - 0.5).abs();
        let fb = (b.fairness_score - 0.5).abs();
        fa.partial_cmp(&fb)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                combined_need(b)
                    .partial_cmp(&combined_need(a))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.to_team.cmp(&b.to_team))
            .then_with(|| a.id.cmp(&b.id))
    });
    accepted.truncate(max_results);

    if truncated {
        warn!(
            from_team = %from.id,
            cap = config.max_candidates,
            "trade search hit the candidate cap; results may be incomplete"
        );
    }
    info!(
        from_team = %from.id,
        mode = request.mode.label(),
        partners = partners.len(),
        evaluated,
        accepted = candidates_accepted,
        returned = accepted.len(),
        "trade proposals generated"
    );

    Ok(GenerationResult {
        proposals: accepted,
        meta: GenerationMeta {
            from_team_id: from.id.clone(),
            mode: request.mode,
            partners_searched: partners.len(),
            candidates_evaluated: evaluated,
            candidates_accepted,
            truncated,
            generated_at,
        },
    })
}

impl Search<'_> {
    /// Evaluate up to `budget` candidates against one partner, in order.
    /// Returns how many were evaluated.
    fn search_cell(
        &mut self,
        partner: &Partner<'_>,
        candidates: Vec<(&[Player], &[Player])>,
        budget: usize,
    ) -> Result<usize, EngineError> {
        if candidates.len() > budget {
            self.truncated = true;
        }
        let take = candidates.len().min(budget);
        for (gives, gets) in candidates.into_iter().take(take) {
            self.consider(partner, gives, gets)?;
        }
        Ok(take)
    }

    fn consider(
        &mut self,
        partner: &Partner<'_>,
        gives: &[Player],
        gets: &[Player],
    ) -> Result<(), EngineError> {
        self.evaluated += 1;

        let trade = TradeRequest {
            team_a: TradeSide {
                gives: gives.to_vec(),
                gets: gets.to_vec(),
            },
            team_b: TradeSide {
                gives: gets.to_vec(),
                gets: gives.to_vec(),
            },
        };
        let teams = TradeTeams {
            name_a: &self.from.name,
            name_b: &partner.team.name,
            roster_a: self.from_roster,
            roster_b: &partner.roster,
            model: self.model,
        };
        let eval = evaluate_trade(&trade, Some(&teams), self.config)?;

        if accepts(self.mode, &eval, self.from_value, partner.roster_value, self.config) {
            self.accepted.push(self.proposal(partner, gives, gets, eval));
        }
        Ok(())
    }

    fn proposal(
        &self,
        partner: &Partner<'_>,
        gives: &[Player],
        gets: &[Player],
        eval: TradeEvaluation,
    ) -> TradeProposal {
        let items: Vec<TradeItem> = gives
            .iter()
            .map(|p| TradeItem::from_player(Direction::Give, p))
            .chain(gets.iter().map(|p| TradeItem::from_player(Direction::Get, p)))
            .collect();
        TradeProposal {
            id: TradeProposal::make_id(&self.from.id, &partner.team.id, &items),
            from_team: self.from.id.clone(),
            to_team: partner.team.id.clone(),
            to_team_name: partner.team.name.clone(),
            items,
            value_delta: eval.value_deltas,
            need_delta: eval.need_deltas,
            fairness_score: eval.fairness_score,
            rationale: eval.rationale,
            generation_mode: self.mode,
            status: ProposalStatus::Draft,
            created_at: self.generated_at,
        }
    }
}

/// Whether an evaluated candidate meets the mode's constraints.
///
/// Strict: neither side loses value. Balanced: neither side's need worsens,
/// and any value loss stays within `value_tolerance` of the losing side's
/// roster value. Need-neutral swaps pass; ranking puts need gains first.
pub fn accepts(
    mode: GenerationMode,
    eval: &TradeEvaluation,
    from_value: f64,
    partner_value: f64,
    config: &TradeConfig,
) -> bool {
    let value = &eval.value_deltas;
    match mode {
        GenerationMode::Strict => value.team_a >= 0.0 && value.team_b >= 0.0,
        GenerationMode::Balanced => {
            let need = &eval.need_deltas;
            need.team_a.delta >= 0.0
                && need.team_b.delta >= 0.0
                && within_tolerance(value.team_a, from_value, config.value_tolerance)
                && within_tolerance(value.team_b, partner_value, config.value_tolerance)
        }
    }
}

fn within_tolerance(delta: f64, roster_value: f64, tolerance: f64) -> bool {
    delta >= 0.0 || -delta <= tolerance * roster_value.max(0.0) + EPSILON
}

fn combined_need(p: &TradeProposal) -> f64 {
    p.need_delta.team_a.delta + p.need_delta.team_b.delta
}

/// The roster players named in `ids`, or the whole roster when `ids` is
/// empty. Every id must be on the roster.
fn select(roster: &[Player], ids: &[String]) -> Result<Vec<Player>, EngineError> {
    if ids.is_empty() {
        return Ok(roster.to_vec());
    }
    let wanted: BTreeSet<&str> = ids.iter().map(String::as_str).collect();
    for id in &wanted {
        if !roster.iter().any(|p| p.id == *id) {
            return Err(EngineError::not_found(EntityKind::Player, *id));
        }
    }
    Ok(roster
        .iter()
        .filter(|p| wanted.contains(p.id.as_str()))
        .cloned()
        .collect())
}

/// Resolve requested targets. Each must be rostered by one of the partner
/// teams.
fn target_set(
    snapshot: &LeagueSnapshot,
    from_id: &str,
    partners: &[&Team],
    ids: &[String],
) -> Result<Option<BTreeSet<String>>, EngineError> {
    if ids.is_empty() {
        return Ok(None);
    }
    let mut set = BTreeSet::new();
    for id in ids {
        let owner = snapshot.owner_of(id);
        let on_partner = owner.is_some_and(|o| o != from_id && partners.iter().any(|t| t.id == o));
        if !on_partner {
            return Err(EngineError::not_found(EntityKind::Player, id.clone()));
        }
        set.insert(id.clone());
    }
    Ok(Some(set))
}

/// Keep the `cap` most valuable players, ties by id.
fn cap_pool(mut pool: Vec<Player>, cap: usize) -> Vec<Player> {
    pool.sort_by(|a, b| {
        b.value_or_zero()
            .partial_cmp(&a.value_or_zero())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    pool.truncate(cap);
    pool
}

/// Every (give, get) pairing, nearest in total value first so a budget cut
/// drops the most lopsided candidates. Ties keep enumeration order.
fn closest_first<'p>(
    gives: &'p [Vec<Player>],
    gets: &'p [Vec<Player>],
) -> Vec<(&'p [Player], &'p [Player])> {
    let total = |pkg: &[Player]| pkg.iter().map(Player::value_or_zero).sum::<f64>();
    let mut pairs: Vec<(f64, &'p [Player], &'p [Player])> = gives
        .iter()
        .flat_map(|give| {
            gets.iter()
                .map(move |get| {
                    let gap = (total(give.as_slice()) - total(get.as_slice())).abs();
                    (gap, give.as_slice(), get.as_slice())
                })
        })
        .collect();
    pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    pairs.into_iter().map(|(_, give, get)| (give, get)).collect()
}

/// All packages of `size` players (1 or 2) drawn from `pool`, in pool order.
fn packages(pool: &[Player], size: usize) -> Vec<Vec<Player>> {
    match size {
        1 => pool.iter().map(|p| vec![p.clone()]).collect(),
        2 => {
            let mut out = Vec::new();
            for (i, a) in pool.iter().enumerate() {
                for b in &pool[i + 1..] {
                    out.push(vec![a.clone(), b.clone()]);
                }
            }
            out
        }
        _ => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
