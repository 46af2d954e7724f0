//! Process configuration.
//!
//! Everything is read from environment variables (a `.env` file is loaded
//! by the binary first). API keys are optional: a missing key produces an
//! unauthenticated request and whatever the upstream answers with.

use std::env;
use std::str::FromStr;

use tracing::warn;

use crate::error::{PipelineError, Result};

pub const ODDS_API_BASE_URL: &str = "https://api.the-odds-api.com";
pub const SPORTS_DEVS_BASE_URL: &str = "https://tennis.sportdevs.com";
pub const DATABASE_URL: &str = "sqlite:odds.db?mode=rwc";

/// Market key that is always flattened one row per outcome.
pub const OUTRIGHT_MARKET: &str = "outrights";

/// Odds column layout of the `odds` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OddsColumns {
    /// `odds_home, odds_away, odds_draw` (generic / outright sports)
    HomeAwayDraw,
    /// `odds_player1, odds_player2` (head-to-head tennis)
    Players,
}

impl OddsColumns {
    pub fn column_names(&self) -> &'static [&'static str] {
        match self {
            OddsColumns::HomeAwayDraw => &["odds_home", "odds_away", "odds_draw"],
            OddsColumns::Players => &["odds_player1", "odds_player2"],
        }
    }
}

impl FromStr for OddsColumns {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "home_away_draw" | "generic" => Ok(OddsColumns::HomeAwayDraw),
            "players" | "tennis" => Ok(OddsColumns::Players),
            other => Err(PipelineError::Config(format!(
                "ODDS_COLUMNS must be home_away_draw or players, got '{}'",
                other
            ))),
        }
    }
}

/// How markets are dispatched between the two-way and per-outcome layouts.
#[derive(Debug, Clone)]
pub struct MarketShape {
    pub columns: OddsColumns,
    /// Outcome count that marks a head-to-head market
    pub two_way_outcomes: usize,
    /// Market keys flattened one row per outcome regardless of count
    pub outright_markets: Vec<String>,
}

impl MarketShape {
    pub fn new(columns: OddsColumns) -> Self {
        Self {
            columns,
            two_way_outcomes: 2,
            outright_markets: vec![OUTRIGHT_MARKET.to_string()],
        }
    }

    pub fn is_outright(&self, market_key: &str) -> bool {
        self.outright_markets.iter().any(|k| k == market_key)
    }
}

impl Default for MarketShape {
    fn default() -> Self {
        Self::new(OddsColumns::HomeAwayDraw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Odds,
    Matches,
    Players,
    Backtest,
    All,
}

impl FromStr for RunMode {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "odds" => Ok(RunMode::Odds),
            "matches" => Ok(RunMode::Matches),
            "players" => Ok(RunMode::Players),
            "backtest" => Ok(RunMode::Backtest),
            "all" => Ok(RunMode::All),
            other => Err(PipelineError::Config(format!("unknown RUN_MODE '{}'", other))),
        }
    }
}

/// Query parameters for The Odds API `/v4/sports/{sport}/odds` call.
#[derive(Debug, Clone)]
pub struct OddsQuery {
    pub sport_key: String,
    pub regions: String,
    pub markets: String,
    pub odds_format: String,
    pub date_format: String,
}

impl Default for OddsQuery {
    fn default() -> Self {
        Self {
            sport_key: "baseball_mlb_world_series_winner".to_string(),
            regions: "us,uk,eu".to_string(),
            markets: OUTRIGHT_MARKET.to_string(),
            odds_format: "decimal".to_string(),
            date_format: "iso".to_string(),
        }
    }
}

/// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub odds_api_key: Option<String>,
    pub sports_devs_api_key: Option<String>,
    pub odds_api_base_url: String,
    pub sports_devs_base_url: String,
    pub database_url: String,
    pub odds_query: OddsQuery,
    pub market_shape: MarketShape,
    pub match_limit: u32,
    pub match_offset: u32,
    pub player_limit: u32,
    /// Team whose roster is fetched in players mode
    pub team_id: Option<i64>,
    pub requests_per_minute: u32,
    pub request_timeout_seconds: u64,
    /// Fraction of capital staked per simulated trade
    pub risk_target: f64,
    pub capital: f64,
    pub run_mode: RunMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            odds_api_key: None,
            sports_devs_api_key: None,
            odds_api_base_url: ODDS_API_BASE_URL.to_string(),
            sports_devs_base_url: SPORTS_DEVS_BASE_URL.to_string(),
            database_url: DATABASE_URL.to_string(),
            odds_query: OddsQuery::default(),
            market_shape: MarketShape::default(),
            match_limit: 10,
            match_offset: 0,
            player_limit: 50,
            team_id: None,
            requests_per_minute: 45,
            request_timeout_seconds: 30,
            risk_target: 0.30,
            capital: 100.0,
            run_mode: RunMode::Odds,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        let odds_api_key = optional_secret("ODDS_API_KEY");
        let sports_devs_api_key = optional_secret("SPORTS_DEVS_API");

        let odds_query = OddsQuery {
            sport_key: env::var("SPORT_KEY").unwrap_or(defaults.odds_query.sport_key),
            regions: env::var("ODDS_REGIONS").unwrap_or(defaults.odds_query.regions),
            markets: env::var("ODDS_MARKETS").unwrap_or(defaults.odds_query.markets),
            odds_format: env::var("ODDS_FORMAT").unwrap_or(defaults.odds_query.odds_format),
            date_format: env::var("DATE_FORMAT").unwrap_or(defaults.odds_query.date_format),
        };

        let columns: OddsColumns = parse_var("ODDS_COLUMNS", OddsColumns::HomeAwayDraw)?;

        let team_id = match env::var("TEAM_ID") {
            Ok(v) if !v.trim().is_empty() => Some(v.trim().parse::<i64>().map_err(|_| {
                PipelineError::Config("TEAM_ID must be an integer".to_string())
            })?),
            _ => None,
        };

        Ok(Self {
            odds_api_key,
            sports_devs_api_key,
            odds_api_base_url: env::var("ODDS_API_BASE_URL")
                .unwrap_or(defaults.odds_api_base_url),
            sports_devs_base_url: env::var("SPORTS_DEVS_BASE_URL")
                .unwrap_or(defaults.sports_devs_base_url),
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            odds_query,
            market_shape: MarketShape::new(columns),
            match_limit: parse_var("MATCH_LIMIT", defaults.match_limit)?,
            match_offset: parse_var("MATCH_OFFSET", defaults.match_offset)?,
            player_limit: parse_var("PLAYER_LIMIT", defaults.player_limit)?,
            team_id,
            requests_per_minute: parse_var("REQUESTS_PER_MINUTE", defaults.requests_per_minute)?,
            request_timeout_seconds: parse_var(
                "REQUEST_TIMEOUT_SECONDS",
                defaults.request_timeout_seconds,
            )?,
            risk_target: parse_var("RISK_TARGET", defaults.risk_target)?,
            capital: parse_var("CAPITAL", defaults.capital)?,
            run_mode: parse_var("RUN_MODE", defaults.run_mode)?,
        })
    }
}

/// Missing or blank keys are not fatal; the request simply goes out without one.
fn optional_secret(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => {
            warn!("{} is not set; requests will be sent unauthenticated", name);
            None
        }
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse::<T>()
            .map_err(|_| PipelineError::Config(format!("{} has an invalid value '{}'", name, v))),
        _ => Ok(default),
    }
}
