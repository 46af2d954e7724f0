//! SQLite persistence: table creation, row writers and the read-back used
//! by the backtest path.

pub mod schema;
pub mod writer;

use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::Result;

pub use schema::initialize;
pub use writer::{
    count_rows, load_odds, upsert_games, upsert_match_batch, upsert_match_details, upsert_matches,
    upsert_players, upsert_roster, upsert_teams, write_odds,
};

/// Open the database, retrying a few times with exponential backoff.
pub async fn connect_with_retry(url: &str, max_retries: u32) -> Result<SqlitePool> {
    let mut attempt = 0;
    loop {
        match SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect(url)
            .await
        {
            Ok(pool) => {
                info!("Connected to {}", url);
                return Ok(pool);
            }
            Err(e) => {
                attempt += 1;
                if attempt >= max_retries {
                    return Err(e.into());
                }
                warn!("Database connection attempt {} failed: {}. Retrying...", attempt, e);
                tokio::time::sleep(Duration::from_secs(2u64.pow(attempt))).await;
            }
        }
    }
}
