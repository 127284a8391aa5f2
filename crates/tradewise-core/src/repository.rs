// Persistence seam between the engine and whatever stores league data.

use anyhow::Result;

use crate::model::LeagueSnapshot;
use crate::trade::{StatusEvent, TradeProposal};
use crate::valuation::{LeagueValuations, Valuation};

/// Storage the service reads snapshots from and writes results to.
///
/// Implementations must make `save_valuations` atomic: a reader calling
/// `latest_valuations` sees either none or all of a batch.
pub trait LeagueRepository {
    /// Everything the engine needs for one league, or `None` if the league
    /// is unknown.
    fn load_league(&self, league_id: &str) -> Result<Option<LeagueSnapshot>>;

    /// Append a recompute batch (valuations and replacement baselines).
    fn save_valuations(&self, batch: &LeagueValuations) -> Result<()>;

    /// The newest valuation per player, ordered by player id.
    fn latest_valuations(&self, league_id: &str) -> Result<Vec<Valuation>>;

    /// Insert a proposal. Re-saving an existing id refreshes its content but
    /// keeps its recorded status.
    fn save_proposal(&self, league_id: &str, proposal: &TradeProposal) -> Result<()>;

    fn load_proposal(&self, league_id: &str, proposal_id: &str) -> Result<Option<TradeProposal>>;

    /// Record a status change and move the proposal to `event.to`. Fails if
    /// the stored status is no longer `event.from`.
    fn record_status_event(&self, league_id: &str, event: &StatusEvent) -> Result<()>;

    /// Status history for a proposal, oldest first.
    fn status_events(&self, league_id: &str, proposal_id: &str) -> Result<Vec<StatusEvent>>;
}
