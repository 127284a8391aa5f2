// Trade evaluation, proposal search, and the proposal lifecycle.

pub mod evaluator;
pub mod generator;
pub mod proposal;

pub use evaluator::{
    evaluate_trade, fairness_score, NeedDelta, PositionNeedChange, SidePair, TradeEvaluation,
    TradeRequest, TradeSide, TradeTeams,
};
pub use generator::{generate_trade_proposals, GenerationMeta, GenerationRequest, GenerationResult};
pub use proposal::{
    Direction, GenerationMode, ProposalStatus, StatusEvent, TradeItem, TradeProposal,
};
