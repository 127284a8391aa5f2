// Player pricing pipeline.
//
// price = anchor + deltaPerf + vorp + global
//
// anchor    market baseline (auction price, else market prior)
// deltaPerf recent form versus expectation, converted to dollars
// vorp      points over the positional replacement level, converted to dollars
// global    league normalization so rosterable prices sum to the league budget

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::conversion::{compute_point_rates, raw_anchor, PointRates};
use super::performance::performance_delta_points;
use super::replacement::{determine_replacement_levels, to_baselines};
use super::{round1, round2};
use crate::config::{EngineConfig, ValuationConfig};
use crate::model::{LeagueSnapshot, Player, Position, ReplacementBaseline};

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Signed dollar contributions that make up a price.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceComponents {
    pub anchor: f64,
    pub delta_perf: f64,
    pub vorp: f64,
    pub global: f64,
}

impl PriceComponents {
    /// The price these components imply, at currency granularity.
    pub fn price(&self) -> f64 {
        round1(self.anchor + self.delta_perf + self.vorp + self.global)
    }
}

/// Price and breakdown for one player.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPrice {
    pub price: f64,
    pub components: PriceComponents,
}

/// A point-in-time price for a (league, player) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Valuation {
    pub league_id: String,
    pub player_id: String,
    pub price: f64,
    pub components: PriceComponents,
    pub ts: DateTime<Utc>,
    pub engine_version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationMetadata {
    pub total_players: usize,
    pub avg_price: f64,
    pub price_range: PriceRange,
}

/// Output of a full-league recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeagueValuations {
    pub league_id: String,
    pub engine_version: String,
    pub computed_at: DateTime<Utc>,
    pub valuations: Vec<Valuation>,
    pub baselines: Vec<ReplacementBaseline>,
    pub metadata: ValuationMetadata,
}

// ---------------------------------------------------------------------------
// League context
// ---------------------------------------------------------------------------

/// League-wide inputs every single-player price depends on: conversion
/// rates, replacement levels, and the global normalization factor.
#[derive(Debug, Clone)]
pub struct LeagueContext<'a> {
    snapshot: &'a LeagueSnapshot,
    config: &'a ValuationConfig,
    rates: PointRates,
    replacement: BTreeMap<Position, f64>,
    rosterable: HashSet<String>,
    global_factor: f64,
}

impl<'a> LeagueContext<'a> {
    /// Calibrate a context from the snapshot.
    ///
    /// The global factor scales the pre-normalization prices of the
    /// `num_teams * roster_size` most valuable players so they sum to the
    /// league's total auction budget.
    pub fn build(snapshot: &'a LeagueSnapshot, config: &'a ValuationConfig) -> Self {
        let rates = compute_point_rates(snapshot);
        let replacement = determine_replacement_levels(snapshot);

        let mut ctx = LeagueContext {
            snapshot,
            config,
            rates,
            replacement,
            rosterable: HashSet::new(),
            global_factor: 1.0,
        };

        let mut pre: Vec<(f64, &str)> = snapshot
            .players
            .iter()
            .map(|p| (ctx.pre_global(p).price(), p.id.as_str()))
            .filter(|(price, _)| *price > 0.0)
            .collect();
        pre.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.cmp(b.1))
        });
        pre.truncate(snapshot.settings.num_teams * snapshot.settings.roster_size());

        let total: f64 = pre.iter().map(|(price, _)| price).sum();
        let target = snapshot.settings.total_budget();
        if total > 0.0 && target > 0.0 {
            ctx.global_factor = target / total;
        }
        ctx.rosterable = pre.into_iter().map(|(_, id)| id.to_string()).collect();

        debug!(
            rosterable = ctx.rosterable.len(),
            market_total = total,
            budget = target,
            factor = ctx.global_factor,
            "global normalization calibrated"
        );

        ctx
    }

    pub fn rates(&self) -> &PointRates {
        &self.rates
    }

    pub fn replacement_levels(&self) -> &BTreeMap<Position, f64> {
        &self.replacement
    }

    /// Anchor, form, and VOR components, with `global` left at zero.
    fn pre_global(&self, player: &Player) -> PriceComponents {
        let cfg = self.config;
        let stats = self.snapshot.stats_for(&player.id);
        let rate = self.rates.rate(player.position);

        let anchor = cfg.anchor_weight * raw_anchor(stats);

        let delta_perf = stats
            .map(|s| performance_delta_points(s, cfg.recent_window, cfg.recency_decay))
            .unwrap_or(0.0)
            * rate
            * cfg.performance_weight;

        let projected = stats.and_then(|s| s.expected_points());
        let vorp = match (projected, self.replacement.get(&player.position)) {
            (Some(points), Some(&baseline)) => {
                (points - baseline).max(0.0) * rate * cfg.vorp_weight
            }
            _ => 0.0,
        };

        PriceComponents {
            anchor: round2(anchor),
            delta_perf: round2(delta_perf),
            vorp: round2(vorp),
            global: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Pricing
// ---------------------------------------------------------------------------

/// Price a single player within a calibrated league context.
///
/// Missing auction data, stats, or baselines contribute zero rather than
/// failing, so every player gets a usable price.
pub fn compute_valuation(player: &Player, ctx: &LeagueContext<'_>) -> PlayerPrice {
    let mut components = ctx.pre_global(player);

    let pre = components.price();
    if pre > 0.0 && ctx.rosterable.contains(&player.id) {
        components.global = round2(ctx.config.global_weight * pre * (ctx.global_factor - 1.0));
    }

    PlayerPrice {
        price: components.price(),
        components,
    }
}

/// Recompute prices for every player in the league.
///
/// Pure: identical snapshot, config, and `computed_at` always produce an
/// identical result. Valuations are ordered by player id.
pub fn compute_league_valuations(
    snapshot: &LeagueSnapshot,
    config: &EngineConfig,
    computed_at: DateTime<Utc>,
) -> LeagueValuations {
    let ctx = LeagueContext::build(snapshot, &config.valuation);

    let mut players: Vec<&Player> = snapshot.players.iter().collect();
    players.sort_by(|a, b| a.id.cmp(&b.id));

    let valuations: Vec<Valuation> = players
        .into_iter()
        .map(|player| {
            let priced = compute_valuation(player, &ctx);
            Valuation {
                league_id: snapshot.league_id.clone(),
                player_id: player.id.clone(),
                price: priced.price,
                components: priced.components,
                ts: computed_at,
                engine_version: config.version.clone(),
            }
        })
        .collect();

    let baselines = to_baselines(
        ctx.replacement_levels(),
        snapshot.season,
        &config.version,
        computed_at,
    );

    let metadata = summarize(&valuations);

    info!(
        league = %snapshot.league_id,
        engine_version = %config.version,
        players = metadata.total_players,
        avg_price = metadata.avg_price,
        "league valuations computed"
    );

    LeagueValuations {
        league_id: snapshot.league_id.clone(),
        engine_version: config.version.clone(),
        computed_at,
        valuations,
        baselines,
        metadata,
    }
}

fn summarize(valuations: &[Valuation]) -> ValuationMetadata {
    if valuations.is_empty() {
        return ValuationMetadata {
            total_players: 0,
            avg_price: 0.0,
            price_range: PriceRange { min: 0.0, max: 0.0 },
        };
    }

    let total: f64 = valuations.iter().map(|v| v.price).sum();
    let min = valuations
        .iter()
        .map(|v| v.price)
        .fold(f64::INFINITY, f64::min);
    let max = valuations
        .iter()
        .map(|v| v.price)
        .fold(f64::NEG_INFINITY, f64::max);

    ValuationMetadata {
        total_players: valuations.len(),
        avg_price: round2(total / valuations.len() as f64),
        price_range: PriceRange { min, max },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
