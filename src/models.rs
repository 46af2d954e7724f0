//! Upstream payload shapes and the flat rows persisted to SQLite.
//!
//! Payload decoding is tolerant per field: a `null` or wrong-typed scalar
//! reads as its default, and a malformed array element is skipped without
//! taking its parent with it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

pub const UNKNOWN_REGION: &str = "unknown";

/// Scalar field: `null` or a wrong type reads as the default.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// Array field: a non-array reads as empty, elements that fail to decode are dropped.
fn lenient_seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match T::deserialize(item) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!("Skipping malformed payload entry: {}", e);
                None
            }
        })
        .collect())
}

/// The Odds API event structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RawEvent {
    #[serde(deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub sport_key: String,
    #[serde(deserialize_with = "lenient")]
    pub commence_time: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub home_team: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub away_team: Option<String>,
    #[serde(deserialize_with = "lenient_seq")]
    pub bookmakers: Vec<Bookmaker>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Bookmaker {
    #[serde(deserialize_with = "lenient")]
    pub key: String,
    #[serde(deserialize_with = "lenient")]
    pub title: String,
    #[serde(deserialize_with = "lenient")]
    pub region: Option<String>,
    #[serde(deserialize_with = "lenient_seq")]
    pub markets: Vec<Market>,
}

impl Bookmaker {
    pub fn region_or_unknown(&self) -> &str {
        self.region.as_deref().unwrap_or(UNKNOWN_REGION)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Market {
    #[serde(deserialize_with = "lenient")]
    pub key: String,
    #[serde(deserialize_with = "lenient_seq")]
    pub outcomes: Vec<Outcome>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Outcome {
    #[serde(deserialize_with = "lenient")]
    pub name: String,
    /// Decimal price. May be absent; never divide by it unchecked.
    #[serde(deserialize_with = "lenient")]
    pub price: Option<f64>,
}

/// One row of the `odds` fact table.
///
/// `odds_a`, `odds_b`, `odds_c` map positionally onto the configured column
/// layout (home/away/draw or player1/player2).
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct OddsRow {
    pub sport_key: String,
    pub event_id: Option<String>,
    pub event_name: Option<String>,
    pub bookmaker: String,
    pub market: String,
    pub odds_a: Option<f64>,
    pub odds_b: Option<f64>,
    pub odds_c: Option<f64>,
    pub region: String,
    pub timestamp: Option<String>,
}

/// Compact match summary, keyed by the upstream match id.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct MatchRecord {
    pub match_id: i64,
    pub match_date: Option<String>,
    pub player1_id: Option<i64>,
    pub player2_id: Option<i64>,
    pub score: Option<String>,
    pub winner_id: Option<i64>,
}

/// Full flattened SportDevs match payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatchDetailRecord {
    pub id: i64,
    pub name: Option<String>,
    pub first_to_serve: Option<i64>,
    pub ground_type: Option<String>,
    pub tournament_id: Option<i64>,
    pub tournament_name: Option<String>,
    pub tournament_importance: Option<i64>,
    pub season_id: Option<i64>,
    pub season_name: Option<String>,
    pub round_id: Option<i64>,
    pub round_name: Option<String>,
    pub round_round: Option<i64>,
    pub round_end_time: Option<String>,
    pub round_start_time: Option<String>,
    pub status_type: Option<String>,
    pub status_reason: Option<String>,
    pub arena_id: Option<i64>,
    pub arena_name: Option<String>,
    pub arena_hash_image: Option<String>,
    pub home_team_id: Option<i64>,
    pub home_team_name: Option<String>,
    pub home_team_hash_image: Option<String>,
    pub away_team_id: Option<i64>,
    pub away_team_name: Option<String>,
    pub away_team_hash_image: Option<String>,
    pub home_score: TeamScore,
    pub away_score: TeamScore,
    pub times_period_1: Option<i64>,
    pub times_period_2: Option<i64>,
    pub times_specific_start_time: Option<String>,
    pub specific_start_time: Option<String>,
    pub start_time: Option<String>,
    pub duration: Option<i64>,
    pub class_id: Option<i64>,
    pub class_name: Option<String>,
    pub class_hash_image: Option<String>,
    pub league_id: Option<i64>,
    pub league_name: Option<String>,
    pub league_hash_image: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TeamScore {
    pub current: Option<i64>,
    pub display: Option<i64>,
    pub period_1: Option<i64>,
    pub period_2: Option<i64>,
    pub default_time: Option<i64>,
}

impl MatchDetailRecord {
    pub fn summary(&self) -> MatchRecord {
        let score = match (self.home_score.display, self.away_score.display) {
            (Some(home), Some(away)) => Some(format!("{}-{}", home, away)),
            _ => None,
        };

        let finished = self.status_type.as_deref() == Some("finished");
        let winner_id = match (self.home_score.current, self.away_score.current) {
            (Some(home), Some(away)) if finished && home > away => self.home_team_id,
            (Some(home), Some(away)) if finished && away > home => self.away_team_id,
            _ => None,
        };

        MatchRecord {
            match_id: self.id,
            match_date: self.start_time.clone(),
            player1_id: self.home_team_id,
            player2_id: self.away_team_id,
            score,
            winner_id,
        }
    }
}

/// Row of `player_stats`. Win-rate columns are reserved and stay empty.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PlayerRecord {
    pub player_id: i64,
    pub team_id: Option<i64>,
    pub team_name: Option<String>,
    pub player_name: Option<String>,
    pub country_name: Option<String>,
    pub player_height: Option<i64>,
    pub age: Option<i64>,
    pub win_rate: Option<f64>,
    pub court_win_rate: Option<f64>,
    pub weather_win_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct TeamRecord {
    pub team_id: i64,
    pub name: Option<String>,
    pub abbreviation: Option<String>,
    pub location: Option<String>,
}

/// Row of the MLB `players` table.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct RosterPlayerRecord {
    pub player_id: i64,
    pub full_name: Option<String>,
    pub team_id: Option<i64>,
    pub position: Option<String>,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct GameRecord {
    pub game_id: i64,
    pub date: Option<String>,
    pub home_team_id: Option<i64>,
    pub away_team_id: Option<i64>,
    pub home_score: Option<i64>,
    pub away_score: Option<i64>,
}
