// Tradewise batch entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file)
// 2. Load config
// 3. Open database, optionally import a league snapshot
// 4. Recompute and save league valuations
// 5. Print valuation metadata and every team's weakness report as JSON

use std::path::PathBuf;

use anyhow::{bail, Context};
use serde_json::json;
use tracing::{error, info};

use tradewise_core::config;
use tradewise_core::db::SqliteRepository;
use tradewise_core::model::LeagueSnapshot;
use tradewise_core::repository::LeagueRepository;
use tradewise_core::service::TradeAssistant;

const USAGE: &str = "usage: tradewise <league_id> [snapshot.json]";

fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("Tradewise starting up");

    let mut args = std::env::args().skip(1);
    let Some(league_id) = args.next() else {
        bail!(USAGE);
    };
    let snapshot_path = args.next().map(PathBuf::from);

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: engine version {}, database {}",
        config.engine.version, config.db_path
    );

    // 3. Open database
    let repo = SqliteRepository::open(&config.db_path).context("failed to open database")?;
    if let Some(path) = snapshot_path {
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let snapshot: LeagueSnapshot = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse league snapshot {}", path.display()))?;
        if snapshot.league_id != league_id {
            bail!(
                "snapshot is for league '{}', not '{league_id}'",
                snapshot.league_id
            );
        }
        repo.import_league(&snapshot)
            .context("failed to import league snapshot")?;
        info!("Imported league {} from {}", league_id, path.display());
    }

    let assistant = TradeAssistant::new(repo, config.engine);

    // 4. Recompute and save valuations
    let batch = assistant
        .compute_league_valuations(&league_id)
        .with_context(|| format!("failed to value league {league_id}"))?;
    assistant
        .save_valuations(&batch)
        .context("failed to save valuations")?;

    // 5. Report
    let snapshot = assistant
        .repository()
        .load_league(&league_id)?
        .with_context(|| format!("league {league_id} disappeared"))?;
    let mut teams = Vec::new();
    for team in &snapshot.teams {
        match assistant.calculate_team_weakness_at(&league_id, &team.id, batch.computed_at) {
            Ok(report) => teams.push(report),
            Err(e) => error!("Weakness for team {} failed: {}", team.id, e),
        }
    }

    let report = json!({
        "leagueId": batch.league_id,
        "engineVersion": batch.engine_version,
        "computedAt": batch.computed_at,
        "metadata": batch.metadata,
        "teams": teams,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    info!("Tradewise finished");
    Ok(())
}

/// Initialize tracing to log to a file so stdout stays clean for the report.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("tradewise.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tradewise=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
