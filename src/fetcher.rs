//! HTTP fetcher for The Odds API and the SportDevs tennis API.
//!
//! Every call is a single rate-limited GET. A non-success status or an
//! unparseable body comes back as an `Err`; nothing here retries or exits.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{Quota, RateLimiter};
use serde_json::Value;
use tracing::{info, warn};

use crate::config::{Config, OddsQuery};
use crate::error::{PipelineError, Result};
use crate::models::RawEvent;

type DirectRateLimiter =
    RateLimiter<governor::state::NotKeyed, governor::state::InMemoryState, governor::clock::DefaultClock>;

/// How a request proves who it is.
#[derive(Debug, Clone)]
pub enum Auth {
    None,
    /// `Authorization: Bearer <token>`
    Bearer(String),
    /// Key passed as the `api_key` query parameter
    QueryKey(String),
}

impl Auth {
    fn bearer(key: Option<&String>) -> Self {
        key.map(|k| Auth::Bearer(k.clone())).unwrap_or(Auth::None)
    }

    fn query_key(key: Option<&String>) -> Self {
        key.map(|k| Auth::QueryKey(k.clone())).unwrap_or(Auth::None)
    }
}

pub struct ApiClient {
    http_client: reqwest::Client,
    rate_limiter: DirectRateLimiter,
    odds_api_base_url: String,
    odds_api_key: Option<String>,
    sports_devs_base_url: String,
    sports_devs_api_key: Option<String>,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let per_minute = NonZeroU32::new(config.requests_per_minute).ok_or_else(|| {
            PipelineError::Config("REQUESTS_PER_MINUTE must be greater than zero".to_string())
        })?;
        let rate_limiter = RateLimiter::direct(Quota::per_minute(per_minute));

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http_client,
            rate_limiter,
            odds_api_base_url: config.odds_api_base_url.trim_end_matches('/').to_string(),
            odds_api_key: config.odds_api_key.clone(),
            sports_devs_base_url: config.sports_devs_base_url.trim_end_matches('/').to_string(),
            sports_devs_api_key: config.sports_devs_api_key.clone(),
        })
    }

    /// GET `endpoint` with `params` and return the parsed JSON body.
    pub async fn fetch(&self, endpoint: &str, params: &[(&str, String)], auth: &Auth) -> Result<Value> {
        self.rate_limiter.until_ready().await;

        let mut request = self
            .http_client
            .get(endpoint)
            .header("Accept", "application/json")
            .query(params);

        match auth {
            Auth::None => {}
            Auth::Bearer(token) => request = request.bearer_auth(token),
            Auth::QueryKey(key) => request = request.query(&[("api_key", key)]),
        }

        let response = request.send().await?;

        if let Some(remaining) = response.headers().get("x-requests-remaining") {
            info!(
                "API requests remaining: {}",
                remaining.to_str().unwrap_or("?")
            );
        }

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("GET {} failed: {} - {}", endpoint, status, body);
            return Err(PipelineError::Transport {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            warn!("GET {} returned a body that is not JSON: {}", endpoint, e);
            PipelineError::Parse(e)
        })
    }

    /// Fetch odds events from The Odds API.
    ///
    /// Array entries that do not look like an event are skipped with a warning.
    pub async fn fetch_odds(&self, query: &OddsQuery) -> Result<Vec<RawEvent>> {
        let url = format!(
            "{}/v4/sports/{}/odds",
            self.odds_api_base_url, query.sport_key
        );

        let body = self
            .fetch(
                &url,
                &[
                    ("regions", query.regions.clone()),
                    ("markets", query.markets.clone()),
                    ("oddsFormat", query.odds_format.clone()),
                    ("dateFormat", query.date_format.clone()),
                ],
                &Auth::query_key(self.odds_api_key.as_ref()),
            )
            .await?;

        let events = parse_events(body)?;
        info!("Fetched {} events from The Odds API", events.len());
        Ok(events)
    }

    /// Fetch one page of tennis matches.
    pub async fn fetch_matches(&self, offset: u32, limit: u32) -> Result<Vec<Value>> {
        let url = format!("{}/matches/", self.sports_devs_base_url);
        let body = self
            .fetch(
                &url,
                &[("offset", offset.to_string()), ("limit", limit.to_string())],
                &Auth::bearer(self.sports_devs_api_key.as_ref()),
            )
            .await?;

        let matches = expect_array(body, "matches")?;
        info!("Fetched {} matches", matches.len());
        Ok(matches)
    }

    /// Fetch team records (each with a `players` array) for one team.
    pub async fn fetch_players_by_team(&self, team_id: i64, limit: u32) -> Result<Vec<Value>> {
        let url = format!("{}/players-by-team", self.sports_devs_base_url);
        let body = self
            .fetch(
                &url,
                &[
                    ("team_id", format!("eq.{}", team_id)),
                    ("limit", limit.to_string()),
                    ("offset", "0".to_string()),
                    ("lang", "en".to_string()),
                ],
                &Auth::bearer(self.sports_devs_api_key.as_ref()),
            )
            .await?;

        expect_array(body, "players-by-team")
    }
}

fn expect_array(body: Value, what: &str) -> Result<Vec<Value>> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        other => {
            let message = format!("expected a JSON array from {}, got {}", what, type_name(&other));
            Err(PipelineError::Parse(serde::de::Error::custom(message)))
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Decode each array entry on its own so one malformed event does not sink the batch.
pub fn parse_events(body: Value) -> Result<Vec<RawEvent>> {
    let items = expect_array(body, "odds")?;
    let mut events = Vec::with_capacity(items.len());

    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<RawEvent>(item) {
            Ok(event) => events.push(event),
            Err(e) => warn!("Skipping malformed odds event #{}: {}", index, e),
        }
    }

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MarketShape;
    use crate::flatten::flatten_events;
    use serde_json::json;

    #[test]
    fn parse_events_skips_entries_that_are_not_objects() {
        let events = parse_events(json!([
            {"sport_key": "tennis_atp", "bookmakers": []},
            "garbage",
            {"sport_key": "tennis_wta"}
        ]))
        .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].sport_key, "tennis_wta");
    }

    #[test]
    fn bad_bookmaker_does_not_drop_its_event() {
        let events = parse_events(json!([
            {
                "sport_key": "baseball_mlb_world_series_winner",
                "bookmakers": [
                    {"title": "FanDuel", "markets": [{"key": "outrights", "outcomes": [
                        {"name": "Los Angeles Dodgers", "price": 1.62},
                        {"name": "New York Yankees", "price": 2.4}
                    ]}]},
                    {"title": "Bovada", "markets": [{"key": "outrights", "outcomes": [
                        {"name": "Cleveland Guardians", "price": "N/A"}
                    ]}]},
                    null
                ]
            }
        ]))
        .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].bookmakers.len(), 2);

        let rows = flatten_events(&events, &MarketShape::default());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].odds_a, Some(1.62));
        assert_eq!(rows[1].odds_a, Some(2.4));
        assert_eq!(rows[2].bookmaker, "Bovada");
        assert!(rows[2].odds_a.is_none());
    }

    #[test]
    fn parse_events_rejects_non_array_body() {
        let err = parse_events(json!({"message": "quota exceeded"})).unwrap_err();
        assert!(matches!(err, PipelineError::Parse(_)));
    }

    #[test]
    fn null_body_is_empty() {
        assert!(parse_events(Value::Null).unwrap().is_empty());
    }
}
