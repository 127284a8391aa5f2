// Trade evaluation: value deltas, need deltas, fairness, and rationale.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::TradeConfig;
use crate::error::EngineError;
use crate::model::{Player, Position};
use crate::valuation::round2;
use crate::weakness::{calculate_team_weakness, position_deficits, NeedModel};

// ---------------------------------------------------------------------------
// Request / result types
// ---------------------------------------------------------------------------

/// One team's half of a trade.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeSide {
    #[serde(default)]
    pub gives: Vec<Player>,
    #[serde(default)]
    pub gets: Vec<Player>,
}

impl TradeSide {
    pub fn gives_value(&self) -> f64 {
        self.gives.iter().map(Player::value_or_zero).sum()
    }

    pub fn gets_value(&self) -> f64 {
        self.gets.iter().map(Player::value_or_zero).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.gives.is_empty() && self.gets.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRequest {
    pub team_a: TradeSide,
    pub team_b: TradeSide,
}

impl TradeRequest {
    /// The same trade seen from the other team's perspective.
    pub fn reversed(&self) -> Self {
        TradeRequest {
            team_a: self.team_b.clone(),
            team_b: self.team_a.clone(),
        }
    }
}

/// A value reported once per side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SidePair<T> {
    pub team_a: T,
    pub team_b: T,
}

/// Deficit points at one position before and after a trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionNeedChange {
    pub position: Position,
    pub before: f64,
    pub after: f64,
}

/// Change in one team's need score. `delta = before - after`, so a positive
/// delta is an improvement.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NeedDelta {
    pub before: f64,
    pub after: f64,
    pub delta: f64,
    /// Positions whose deficit changes, in position order.
    pub positions: Vec<PositionNeedChange>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeEvaluation {
    /// 0.5 is balanced; above 0.5 favours team A, below favours team B.
    pub fairness_score: f64,
    pub rationale: String,
    pub value_deltas: SidePair<f64>,
    pub need_deltas: SidePair<NeedDelta>,
}

/// Current rosters of both teams plus the league need model, used to score
/// how the trade changes each team's needs.
#[derive(Debug, Clone, Copy)]
pub struct TradeTeams<'a> {
    pub name_a: &'a str,
    pub name_b: &'a str,
    pub roster_a: &'a [Player],
    pub roster_b: &'a [Player],
    pub model: &'a NeedModel,
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Evaluate a proposed trade.
///
/// `ΔValue_X = Σ value(gets_X) − Σ value(gives_X)`. Players without a value
/// count as zero, and empty sides are legal. Without `teams`, need deltas
/// are reported as unchanged.
///
/// Fails only for malformed requests: a player listed twice on one side, or
/// on both the give and get list of the same side.
pub fn evaluate_trade(
    trade: &TradeRequest,
    teams: Option<&TradeTeams<'_>>,
    config: &TradeConfig,
) -> Result<TradeEvaluation, EngineError> {
    validate_side(&trade.team_a, "teamA")?;
    validate_side(&trade.team_b, "teamB")?;

    let value_deltas = SidePair {
        team_a: round2(trade.team_a.gets_value() - trade.team_a.gives_value()),
        team_b: round2(trade.team_b.gets_value() - trade.team_b.gives_value()),
    };

    let need_deltas = match teams {
        Some(t) => SidePair {
            team_a: need_delta(t.roster_a, &trade.team_a, t.model),
            team_b: need_delta(t.roster_b, &trade.team_b, t.model),
        },
        None => SidePair {
            team_a: NeedDelta::default(),
            team_b: NeedDelta::default(),
        },
    };

    let gross = traded_value(trade);
    let fairness_score = fairness_score(value_deltas.team_a, value_deltas.team_b, gross, config);

    let (name_a, name_b) = teams
        .map(|t| (t.name_a, t.name_b))
        .unwrap_or(("Team A", "Team B"));
    let rationale = build_rationale(
        trade,
        &value_deltas,
        &need_deltas,
        fairness_score,
        (name_a, name_b),
    );

    Ok(TradeEvaluation {
        fairness_score,
        rationale,
        value_deltas,
        need_deltas,
    })
}

/// Map the value asymmetry between the sides into [0, 1].
///
/// A logistic curve over `(ΔA − ΔB) / scale`, where the scale grows with the
/// dollars changing hands (never below `fairness_scale_floor`). Swapping the
/// sides negates the argument, so `f(A,B) + f(B,A) = 1`, and equal deltas
/// land on exactly 0.5.
pub fn fairness_score(delta_a: f64, delta_b: f64, gross: f64, config: &TradeConfig) -> f64 {
    let scale = config
        .fairness_scale_floor
        .max(config.fairness_scale_fraction * gross);
    let x = (delta_a - delta_b) / scale;
    let score = 1.0 / (1.0 + (-x).exp());
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.5
    }
}

/// Dollars changing hands: half the absolute value of every listed player,
/// since each player normally appears once per side.
fn traded_value(trade: &TradeRequest) -> f64 {
    [
        &trade.team_a.gives,
        &trade.team_a.gets,
        &trade.team_b.gives,
        &trade.team_b.gets,
    ]
    .iter()
    .flat_map(|list| list.iter())
    .map(|p| p.value_or_zero().abs())
    .sum::<f64>()
        / 2.0
}

fn validate_side(side: &TradeSide, label: &str) -> Result<(), EngineError> {
    let mut gives = HashSet::new();
    for p in &side.gives {
        if p.id.trim().is_empty() {
            return Err(EngineError::malformed(format!("{label}.gives has a player without an id")));
        }
        if !gives.insert(p.id.as_str()) {
            return Err(EngineError::malformed(format!(
                "{label}.gives lists player {} more than once",
                p.id
            )));
        }
    }

    let mut gets = HashSet::new();
    for p in &side.gets {
        if p.id.trim().is_empty() {
            return Err(EngineError::malformed(format!("{label}.gets has a player without an id")));
        }
        if !gets.insert(p.id.as_str()) {
            return Err(EngineError::malformed(format!(
                "{label}.gets lists player {} more than once",
                p.id
            )));
        }
        if gives.contains(p.id.as_str()) {
            return Err(EngineError::malformed(format!(
                "{label} both gives and gets player {}",
                p.id
            )));
        }
    }

    Ok(())
}

/// Roster after the side's gives leave and its gets arrive.
pub fn apply_side(roster: &[Player], side: &TradeSide) -> Vec<Player> {
    let leaving: HashSet<&str> = side.gives.iter().map(|p| p.id.as_str()).collect();
    let mut after: Vec<Player> = roster
        .iter()
        .filter(|p| !leaving.contains(p.id.as_str()))
        .cloned()
        .collect();
    for incoming in &side.gets {
        if !after.iter().any(|p| p.id == incoming.id) {
            after.push(incoming.clone());
        }
    }
    after
}

fn need_delta(roster: &[Player], side: &TradeSide, model: &NeedModel) -> NeedDelta {
    let after_roster = apply_side(roster, side);

    let before = calculate_team_weakness(roster, model).need_score;
    let after = calculate_team_weakness(&after_roster, model).need_score;

    let deficits_before = position_deficits(roster, model);
    let deficits_after = position_deficits(&after_roster, model);
    let positions = deficits_before
        .iter()
        .filter_map(|(&position, &b)| {
            let a = deficits_after.get(&position).copied().unwrap_or(0.0);
            (a != b).then_some(PositionNeedChange {
                position,
                before: b,
                after: a,
            })
        })
        .collect();

    NeedDelta {
        before,
        after,
        delta: round2(before - after),
        positions,
    }
}

// ---------------------------------------------------------------------------
// Rationale
// ---------------------------------------------------------------------------

fn money(x: f64) -> String {
    if x > 0.0 {
        format!("+${x:.1}")
    } else if x < 0.0 {
        format!("-${:.1}", x.abs())
    } else {
        "$0.0".to_string()
    }
}

fn build_rationale(
    trade: &TradeRequest,
    value: &SidePair<f64>,
    need: &SidePair<NeedDelta>,
    fairness: f64,
    (name_a, name_b): (&str, &str),
) -> String {
    if trade.team_a.is_empty() && trade.team_b.is_empty() {
        return format!(
            "No players change hands, so value is unchanged and the trade is balanced \
             (fairness score {fairness:.2})."
        );
    }

    let tilt = (fairness - 0.5).abs();
    let favoured = if fairness > 0.5 { name_a } else { name_b };
    let verdict = if tilt <= 0.05 {
        "This trade is fair and balanced in value".to_string()
    } else if tilt <= 0.15 {
        format!("This trade slightly favors {favoured} in value")
    } else {
        format!("This trade clearly favors {favoured} in value")
    };

    let mut text = format!(
        "{verdict}: {name_a} {} and {name_b} {} (fairness score {fairness:.2}).",
        money(value.team_a),
        money(value.team_b),
    );

    let positions: BTreeSet<Position> = [
        &trade.team_a.gives,
        &trade.team_a.gets,
        &trade.team_b.gives,
        &trade.team_b.gets,
    ]
    .iter()
    .flat_map(|list| list.iter().map(|p| p.position))
    .collect();
    if !positions.is_empty() {
        let names: Vec<&str> = positions.iter().map(|p| p.display_str()).collect();
        text.push_str(&format!(" Positions involved: {}.", names.join(", ")));
    }

    let need_parts: Vec<String> = [(name_a, &need.team_a), (name_b, &need.team_b)]
        .into_iter()
        .filter(|(_, d)| d.delta != 0.0)
        .map(|(name, d)| {
            let verb = if d.delta > 0.0 { "improves" } else { "worsens" };
            let mut part = format!("{name}'s need score {verb} by {:.1}", d.delta.abs());
            if !d.positions.is_empty() {
                let list: Vec<&str> = d.positions.iter().map(|c| c.position.display_str()).collect();
                part.push_str(&format!(" ({})", list.join(", ")));
            }
            part
        })
        .collect();
    if !need_parts.is_empty() {
        text.push_str(&format!(" {}.", need_parts.join("; ")));
    }

    text
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
