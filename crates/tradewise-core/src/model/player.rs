// Player identity, roster positions, and raw valuation inputs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Football roster positions tracked by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "QB")]
    Quarterback,
    #[serde(rename = "RB")]
    RunningBack,
    #[serde(rename = "WR")]
    WideReceiver,
    #[serde(rename = "TE")]
    TightEnd,
    #[serde(rename = "K")]
    Kicker,
    #[serde(rename = "D/ST", alias = "DST", alias = "DEF")]
    Defense,
}

/// Every position in deterministic display order.
pub const ALL_POSITIONS: &[Position] = &[
    Position::Quarterback,
    Position::RunningBack,
    Position::WideReceiver,
    Position::TightEnd,
    Position::Kicker,
    Position::Defense,
];

impl Position {
    /// Parse a position abbreviation into a Position.
    ///
    /// Accepts platform spellings of the defense slot ("D/ST", "DST", "DEF").
    pub fn from_str_pos(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "QB" => Some(Position::Quarterback),
            "RB" => Some(Position::RunningBack),
            "WR" => Some(Position::WideReceiver),
            "TE" => Some(Position::TightEnd),
            "K" | "PK" => Some(Position::Kicker),
            "D/ST" | "DST" | "DEF" | "D" => Some(Position::Defense),
            _ => None,
        }
    }

    /// Return the display abbreviation for this position.
    pub fn display_str(&self) -> &'static str {
        match self {
            Position::Quarterback => "QB",
            Position::RunningBack => "RB",
            Position::WideReceiver => "WR",
            Position::TightEnd => "TE",
            Position::Kicker => "K",
            Position::Defense => "D/ST",
        }
    }

    /// Deterministic ordering index for reports.
    pub fn sort_order(&self) -> u8 {
        match self {
            Position::Quarterback => 0,
            Position::RunningBack => 1,
            Position::WideReceiver => 2,
            Position::TightEnd => 3,
            Position::Kicker => 4,
            Position::Defense => 5,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

/// A rostered or free-agent player.
///
/// Identity fields are fixed; `value` is the current price and changes every
/// time league valuations are recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: String,
    pub name: String,
    pub position: Position,
    /// Pro team abbreviation (e.g. "KC"), if known.
    #[serde(default)]
    pub nfl_team: Option<String>,
    /// Current price. `None` when the player has never been valued.
    #[serde(default)]
    pub value: Option<f64>,
    /// Projected fantasy points per week.
    #[serde(default)]
    pub points: Option<f64>,
}

impl Player {
    pub fn new(id: &str, name: &str, position: Position) -> Self {
        Player {
            id: id.to_string(),
            name: name.to_string(),
            position,
            nfl_team: None,
            value: None,
            points: None,
        }
    }

    /// Current price, treating a missing or non-finite value as zero.
    pub fn value_or_zero(&self) -> f64 {
        finite_or_zero(self.value)
    }
}

/// Raw per-player inputs to the valuation engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub player_id: String,
    /// Most recent auction or draft price paid for the player.
    #[serde(default)]
    pub auction_price: Option<f64>,
    /// Market-derived prior price (ADP conversion or similar) used when the
    /// player was never auctioned.
    #[serde(default)]
    pub market_prior: Option<f64>,
    /// Season-long expected fantasy points per week.
    #[serde(default)]
    pub projected_points: Option<f64>,
    /// Actual fantasy points per week, oldest first.
    #[serde(default)]
    pub weekly_points: Vec<f64>,
}

impl PlayerStats {
    /// Season average of the finite weekly scores, if any were recorded.
    pub fn season_average(&self) -> Option<f64> {
        let scores: Vec<f64> = self
            .weekly_points
            .iter()
            .copied()
            .filter(|p| p.is_finite())
            .collect();
        if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f64>() / scores.len() as f64)
        }
    }

    /// Expected points per week: the projection, else the season average.
    pub fn expected_points(&self) -> Option<f64> {
        self.projected_points
            .filter(|p| p.is_finite())
            .or_else(|| self.season_average())
    }
}

/// Map `None`, NaN, and infinities to zero.
pub(crate) fn finite_or_zero(v: Option<f64>) -> f64 {
    match v {
        Some(x) if x.is_finite() => x,
        _ => 0.0,
    }
}
