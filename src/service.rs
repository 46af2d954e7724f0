//! Ingestion service: fetch → flatten → write, one sequential pass per call.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::fetcher::ApiClient;
use crate::flatten::{flatten_events, flatten_matches, flatten_players};
use crate::storage;

pub struct IngestionService {
    config: Config,
    db: SqlitePool,
    client: ApiClient,
}

impl IngestionService {
    pub fn new(config: Config, db: SqlitePool) -> Result<Self> {
        let client = ApiClient::new(&config)?;
        Ok(Self { config, db, client })
    }

    pub fn db(&self) -> &SqlitePool {
        &self.db
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetch, flatten and append odds rows. A failed fetch writes nothing.
    pub async fn ingest_odds(&self) -> Result<usize> {
        let events = self.client.fetch_odds(&self.config.odds_query).await?;
        if events.is_empty() {
            warn!(
                "No odds events returned for {}; check the API key, sport or markets",
                self.config.odds_query.sport_key
            );
            return Ok(0);
        }

        let shape = &self.config.market_shape;
        let rows = flatten_events(&events, shape);
        info!(
            "Flattened {} events into {} odds rows",
            events.len(),
            rows.len()
        );

        storage::write_odds(&self.db, &rows, shape.columns).await
    }

    /// Fetch one page of matches and upsert the detail and summary tables together.
    pub async fn ingest_matches(&self) -> Result<usize> {
        let payload = self
            .client
            .fetch_matches(self.config.match_offset, self.config.match_limit)
            .await?;
        if payload.is_empty() {
            warn!("No matches data returned");
            return Ok(0);
        }

        let details = flatten_matches(&payload);
        let summaries: Vec<_> = details.iter().map(|d| d.summary()).collect();

        storage::upsert_match_batch(&self.db, &details, &summaries).await
    }

    /// Fetch a team's players and upsert them into `player_stats`.
    pub async fn ingest_players(&self, team_id: i64) -> Result<usize> {
        info!("Fetching player data for team_id {} ...", team_id);
        let payload = self
            .client
            .fetch_players_by_team(team_id, self.config.player_limit)
            .await?;
        if payload.is_empty() {
            warn!("No player data returned for team {}", team_id);
            return Ok(0);
        }

        let players = flatten_players(&payload, Utc::now().date_naive());
        storage::upsert_players(&self.db, &players).await
    }
}
