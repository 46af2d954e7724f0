//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use odds_pipeline::config::{Config, MarketShape, OddsColumns};
use odds_pipeline::models::OddsRow;
use odds_pipeline::storage;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

/// Single-connection in-memory database with every table created.
pub async fn memory_db(columns: OddsColumns) -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    storage::initialize(&pool, columns).await.expect("schema");
    pool
}

pub fn test_config(base_url: &str, columns: OddsColumns) -> Config {
    Config {
        odds_api_key: Some("test-odds-key".to_string()),
        sports_devs_api_key: Some("test-sd-key".to_string()),
        odds_api_base_url: base_url.to_string(),
        sports_devs_base_url: base_url.to_string(),
        market_shape: MarketShape::new(columns),
        requests_per_minute: 600,
        request_timeout_seconds: 5,
        ..Config::default()
    }
}

pub fn odds_row(event_name: &str, odds: f64) -> OddsRow {
    OddsRow {
        sport_key: "baseball_mlb_world_series_winner".to_string(),
        event_id: None,
        event_name: Some(event_name.to_string()),
        bookmaker: "FanDuel".to_string(),
        market: "outrights".to_string(),
        odds_a: Some(odds),
        odds_b: None,
        odds_c: None,
        region: "us".to_string(),
        timestamp: Some("2024-10-25T00:08:00Z".to_string()),
    }
}
