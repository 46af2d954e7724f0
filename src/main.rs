//! Odds pipeline runner.
//!
//! `RUN_MODE` picks what a single invocation does: ingest odds, matches or
//! players, run the backtest over stored odds, or all of it in order.

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use odds_pipeline::config::{Config, RunMode};
use odds_pipeline::storage;
use odds_pipeline::strategy::{
    ClassifierStrategy, ExpectedValueStrategy, Strategy, TradingSystem,
};
use odds_pipeline::IngestionService;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(
                    "odds_pipeline=info"
                        .parse::<tracing_subscriber::filter::Directive>()
                        .context("invalid log directive")?,
                ),
        )
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    info!("Odds pipeline starting (mode: {:?})", config.run_mode);

    let db = storage::connect_with_retry(&config.database_url, 5)
        .await
        .context("Failed to open database")?;
    storage::initialize(&db, config.market_shape.columns)
        .await
        .context("Failed to initialize tables")?;

    let run_mode = config.run_mode;
    let service = IngestionService::new(config, db).context("Failed to build API client")?;

    if let Err(e) = run(&service, run_mode).await {
        error!("Run failed: {:?}", e);
        return Err(e);
    }

    Ok(())
}

async fn run(service: &IngestionService, mode: RunMode) -> Result<()> {
    if matches!(mode, RunMode::Odds | RunMode::All) {
        let count = service.ingest_odds().await.context("Odds ingestion failed")?;
        info!("Odds ingestion completed: {} rows stored", count);
    }

    if matches!(mode, RunMode::Matches | RunMode::All) {
        let count = service.ingest_matches().await.context("Match ingestion failed")?;
        info!("Match ingestion completed: {} matches stored", count);
    }

    if matches!(mode, RunMode::Players | RunMode::All) {
        match service.config().team_id {
            Some(team_id) => {
                let count = service
                    .ingest_players(team_id)
                    .await
                    .context("Player ingestion failed")?;
                info!("Player ingestion completed: {} players stored", count);
            }
            None => warn!("TEAM_ID is not set; skipping player ingestion"),
        }
    }

    if matches!(mode, RunMode::Backtest | RunMode::All) {
        backtest(service).await?;
    }

    Ok(())
}

async fn backtest(service: &IngestionService) -> Result<()> {
    let config = service.config();
    let odds = storage::load_odds(service.db(), config.market_shape.columns)
        .await
        .context("Failed to read stored odds")?;

    let mut strategies: Vec<(f64, Box<dyn Strategy>)> = Vec::new();

    if odds.is_empty() {
        warn!("No stored odds; the expected-value strategy is skipped");
    } else {
        let mut ev = ExpectedValueStrategy::new(config.risk_target, config.capital);
        ev.load(odds);
        strategies.push((0.5, Box::new(ev)));
    }

    let mut classifier = ClassifierStrategy::calibrated_logistic(config.risk_target, config.capital);
    classifier.prepare().context("Failed to train classifier strategy")?;
    let proportion = if strategies.is_empty() { 1.0 } else { 0.5 };
    strategies.push((proportion, Box::new(classifier)));

    info!("Running backtest...");
    let results = TradingSystem::new(strategies)
        .backtest()
        .context("Backtest failed")?;

    for (proportion, result) in results {
        println!("\nStrategy Proportion: {}", proportion);
        println!("{}", result);
    }

    Ok(())
}
