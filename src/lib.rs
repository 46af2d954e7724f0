//! Sports odds ingestion and strategy backtesting.
//!
//! Ingestion: `fetcher` pulls JSON from The Odds API or SportDevs,
//! `flatten` turns it into table rows, `storage` writes them to SQLite.
//! Analysis: `strategy` reads odds back (or generates synthetic features)
//! and reports simulated trading outcomes.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod flatten;
pub mod models;
pub mod service;
pub mod storage;
pub mod strategy;

pub use config::Config;
pub use error::{PipelineError, Result};
pub use service::IngestionService;
