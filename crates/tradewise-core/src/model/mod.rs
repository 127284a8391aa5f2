// Domain model: players, teams, and the league snapshot the engine reads.

pub mod league;
pub mod player;

pub use league::{LeagueSettings, LeagueSnapshot, ReplacementBaseline, Team};
pub use player::{Player, PlayerStats, Position, ALL_POSITIONS};
