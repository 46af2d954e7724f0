//! Turns nested upstream payloads into flat table rows.
//!
//! Odds: event → bookmakers → markets → outcomes. A head-to-head market
//! becomes one row with both prices in positional order; an outright market
//! becomes one row per outcome with the price in the first odds column.
//! Missing pieces are nulls, never errors.

use chrono::{DateTime, Datelike, NaiveDate};
use serde_json::Value;
use tracing::warn;

use crate::config::MarketShape;
use crate::models::{
    Bookmaker, Market, MatchDetailRecord, OddsRow, PlayerRecord, RawEvent, TeamScore,
};

pub fn flatten_events(events: &[RawEvent], shape: &MarketShape) -> Vec<OddsRow> {
    let mut rows = Vec::new();

    for event in events {
        for bookmaker in &event.bookmakers {
            for market in &bookmaker.markets {
                flatten_market(event, bookmaker, market, shape, &mut rows);
            }
        }
    }

    rows
}

fn flatten_market(
    event: &RawEvent,
    bookmaker: &Bookmaker,
    market: &Market,
    shape: &MarketShape,
    rows: &mut Vec<OddsRow>,
) {
    let base = OddsRow {
        sport_key: event.sport_key.clone(),
        event_id: event.id.clone(),
        event_name: None,
        bookmaker: bookmaker.title.clone(),
        market: market.key.clone(),
        odds_a: None,
        odds_b: None,
        odds_c: None,
        region: bookmaker.region_or_unknown().to_string(),
        timestamp: event.commence_time.clone(),
    };

    let count = market.outcomes.len();
    let slots = shape.columns.column_names().len();
    let grouped = !shape.is_outright(&market.key)
        && count >= 2
        && count == shape.two_way_outcomes
        && count <= slots;

    if grouped {
        let price = |i: usize| market.outcomes.get(i).and_then(|o| o.price);
        let names: Vec<&str> = market.outcomes.iter().map(|o| o.name.as_str()).collect();
        rows.push(OddsRow {
            event_name: Some(grouped_event_name(event, &names)),
            odds_a: price(0),
            odds_b: price(1),
            odds_c: price(2),
            ..base
        });
        return;
    }

    for outcome in &market.outcomes {
        rows.push(OddsRow {
            event_name: Some(outcome.name.clone()),
            odds_a: outcome.price,
            ..base.clone()
        });
    }
}

fn grouped_event_name(event: &RawEvent, outcome_names: &[&str]) -> String {
    match (&event.home_team, &event.away_team) {
        (Some(home), Some(away)) => format!("{} vs {}", home, away),
        _ => outcome_names.join(" vs "),
    }
}

fn int(value: &Value, key: &str) -> Option<i64> {
    value.get(key).and_then(Value::as_i64)
}

fn text(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Nested object lookup; a missing object reads as `null`.
fn nested<'a>(value: &'a Value, key: &str) -> &'a Value {
    value.get(key).unwrap_or(&Value::Null)
}

fn team_score(value: &Value) -> TeamScore {
    TeamScore {
        current: int(value, "current"),
        display: int(value, "display"),
        period_1: int(value, "period_1"),
        period_2: int(value, "period_2"),
        default_time: int(value, "default_time"),
    }
}

/// Flatten a SportDevs match. Matches without an integer `id` cannot be keyed and are dropped.
pub fn flatten_match(m: &Value) -> Option<MatchDetailRecord> {
    let Some(id) = int(m, "id") else {
        warn!("Skipping match without an id");
        return None;
    };

    let round = nested(m, "round");
    let status = nested(m, "status");
    let times = nested(m, "times");

    Some(MatchDetailRecord {
        id,
        name: text(m, "name"),
        first_to_serve: int(m, "first_to_serve"),
        ground_type: text(m, "ground_type"),
        tournament_id: int(m, "tournament_id"),
        tournament_name: text(m, "tournament_name"),
        tournament_importance: int(m, "tournament_importance"),
        season_id: int(m, "season_id"),
        season_name: text(m, "season_name"),
        round_id: int(m, "round_id"),
        round_name: text(round, "name"),
        round_round: int(round, "round"),
        round_end_time: text(round, "end_time"),
        round_start_time: text(round, "start_time"),
        status_type: text(m, "status_type"),
        status_reason: text(status, "reason"),
        arena_id: int(m, "arena_id"),
        arena_name: text(m, "arena_name"),
        arena_hash_image: text(m, "arena_hash_image"),
        home_team_id: int(m, "home_team_id"),
        home_team_name: text(m, "home_team_name"),
        home_team_hash_image: text(m, "home_team_hash_image"),
        away_team_id: int(m, "away_team_id"),
        away_team_name: text(m, "away_team_name"),
        away_team_hash_image: text(m, "away_team_hash_image"),
        home_score: team_score(nested(m, "home_team_score")),
        away_score: team_score(nested(m, "away_team_score")),
        times_period_1: int(times, "period_1"),
        times_period_2: int(times, "period_2"),
        times_specific_start_time: text(times, "specific_start_time"),
        specific_start_time: text(m, "specific_start_time"),
        start_time: text(m, "start_time"),
        duration: int(m, "duration"),
        class_id: int(m, "class_id"),
        class_name: text(m, "class_name"),
        class_hash_image: text(m, "class_hash_image"),
        league_id: int(m, "league_id"),
        league_name: text(m, "league_name"),
        league_hash_image: text(m, "league_hash_image"),
    })
}

pub fn flatten_matches(matches: &[Value]) -> Vec<MatchDetailRecord> {
    matches.iter().filter_map(flatten_match).collect()
}

/// Flatten `players-by-team` team records into `player_stats` rows, ages as of `today`.
pub fn flatten_players(team_records: &[Value], today: NaiveDate) -> Vec<PlayerRecord> {
    let mut players = Vec::new();

    for team in team_records {
        let team_id = int(team, "team_id");
        let team_name = text(team, "team_name");
        let Some(roster) = team.get("players").and_then(Value::as_array) else {
            continue;
        };

        for player in roster {
            let Some(player_id) = int(player, "id") else {
                warn!("Skipping player without an id on team {:?}", team_name);
                continue;
            };

            let age = player
                .get("date_of_birth")
                .and_then(Value::as_str)
                .and_then(|dob| calculate_age(dob, today))
                .map(i64::from);

            players.push(PlayerRecord {
                player_id,
                team_id,
                team_name: team_name.clone(),
                player_name: text(player, "name"),
                country_name: text(player, "country_name"),
                player_height: int(player, "player_height"),
                age,
                win_rate: None,
                court_win_rate: None,
                weather_win_rate: None,
            });
        }
    }

    players
}

/// Age in whole years on `on` for an ISO-8601 date of birth
/// (`1998-08-31T00:00:00+00:00`, `...Z`, or plain `1998-08-31`).
pub fn calculate_age(dob: &str, on: NaiveDate) -> Option<u32> {
    let dob = dob.trim();
    let birth = DateTime::parse_from_rfc3339(dob)
        .map(|dt| dt.date_naive())
        .or_else(|_| NaiveDate::parse_from_str(dob, "%Y-%m-%d"));

    let birth = match birth {
        Ok(date) => date,
        Err(e) => {
            warn!("Error calculating age from '{}': {}", dob, e);
            return None;
        }
    };

    let before_birthday = (on.month(), on.day()) < (birth.month(), birth.day());
    let years = on.year() - birth.year() - i32::from(before_birthday);
    u32::try_from(years).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OddsColumns;
    use crate::models::Outcome;
    use serde_json::json;

    fn outcome(name: &str, price: Option<f64>) -> Outcome {
        Outcome { name: name.to_string(), price }
    }

    fn event_with(market_key: &str, outcomes: Vec<Outcome>, region: Option<&str>) -> RawEvent {
        RawEvent {
            id: Some("evt-1".to_string()),
            sport_key: "tennis_atp_us_open".to_string(),
            commence_time: Some("2024-08-30T16:00:00Z".to_string()),
            home_team: None,
            away_team: None,
            bookmakers: vec![Bookmaker {
                key: "pinnacle".to_string(),
                title: "Pinnacle".to_string(),
                region: region.map(str::to_string),
                markets: vec![Market { key: market_key.to_string(), outcomes }],
            }],
        }
    }

    #[test]
    fn head_to_head_keeps_positional_order() {
        let event = event_with(
            "h2h",
            vec![outcome("Sinner", Some(1.45)), outcome("Alcaraz", Some(2.75))],
            Some("eu"),
        );
        let rows = flatten_events(&[event], &MarketShape::new(OddsColumns::Players));

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.odds_a, Some(1.45));
        assert_eq!(row.odds_b, Some(2.75));
        assert_eq!(row.odds_c, None);
        assert_eq!(row.event_name.as_deref(), Some("Sinner vs Alcaraz"));
        assert_eq!(row.event_id.as_deref(), Some("evt-1"));
        assert_eq!(row.region, "eu");
        assert_eq!(row.timestamp.as_deref(), Some("2024-08-30T16:00:00Z"));
    }

    #[test]
    fn head_to_head_prefers_team_names() {
        let mut event = event_with(
            "h2h",
            vec![outcome("Yankees", Some(1.9)), outcome("Dodgers", Some(1.95))],
            None,
        );
        event.home_team = Some("Dodgers".to_string());
        event.away_team = Some("Yankees".to_string());

        let rows = flatten_events(&[event], &MarketShape::default());
        assert_eq!(rows[0].event_name.as_deref(), Some("Dodgers vs Yankees"));
        // positional, not name-matched
        assert_eq!(rows[0].odds_a, Some(1.9));
    }

    #[test]
    fn outright_emits_one_row_per_outcome() {
        let event = event_with(
            "outrights",
            vec![
                outcome("Los Angeles Dodgers", Some(4.5)),
                outcome("New York Yankees", Some(5.0)),
                outcome("Atlanta Braves", Some(7.0)),
                outcome("Houston Astros", None),
            ],
            Some("us"),
        );
        let rows = flatten_events(&[event], &MarketShape::default());

        assert_eq!(rows.len(), 4);
        for row in &rows {
            assert!(row.odds_b.is_none());
            assert!(row.odds_c.is_none());
            assert_eq!(row.market, "outrights");
        }
        assert_eq!(rows[0].event_name.as_deref(), Some("Los Angeles Dodgers"));
        assert_eq!(rows[2].odds_a, Some(7.0));
        assert_eq!(rows[3].odds_a, None);
    }

    #[test]
    fn two_outcome_outright_is_still_per_outcome() {
        let event = event_with(
            "outrights",
            vec![outcome("A", Some(1.5)), outcome("B", Some(2.5))],
            None,
        );
        let rows = flatten_events(&[event], &MarketShape::default());
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.odds_b.is_none()));
    }

    #[test]
    fn three_way_market_falls_back_to_per_outcome() {
        let event = event_with(
            "h2h",
            vec![outcome("Arsenal", Some(2.1)), outcome("Chelsea", Some(3.4)), outcome("Draw", Some(3.3))],
            None,
        );
        let rows = flatten_events(&[event], &MarketShape::default());
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn empty_market_yields_no_rows() {
        let event = event_with("h2h", Vec::new(), None);
        assert!(flatten_events(&[event], &MarketShape::default()).is_empty());
        assert!(flatten_events(&[RawEvent::default()], &MarketShape::default()).is_empty());
    }

    #[test]
    fn missing_region_defaults_to_unknown() {
        let event = event_with("outrights", vec![outcome("A", Some(3.0))], None);
        let rows = flatten_events(&[event], &MarketShape::default());
        assert_eq!(rows[0].region, "unknown");
    }

    #[test]
    fn missing_event_id_stays_null() {
        let mut event = event_with("outrights", vec![outcome("A", Some(3.0))], None);
        event.id = None;
        let rows = flatten_events(&[event], &MarketShape::default());
        assert!(rows[0].event_id.is_none());
    }

    #[test]
    fn age_turns_over_on_birthday() {
        let dob = "1998-08-31T00:00:00+00:00";
        let before = NaiveDate::from_ymd_opt(2024, 8, 30).unwrap();
        let after = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
        assert_eq!(calculate_age(dob, before), Some(25));
        assert_eq!(calculate_age(dob, after), Some(26));
        assert_eq!(calculate_age("1998-08-31T00:00:00Z", after), Some(26));
        assert_eq!(calculate_age("1998-08-31", before), Some(25));
        assert_eq!(calculate_age("not a date", after), None);
    }

    #[test]
    fn match_flattening_reads_nested_objects() {
        let payload = json!({
            "id": 101,
            "name": "Sinner vs Medvedev",
            "ground_type": "Hardcourt outdoor",
            "status_type": "finished",
            "status": {"reason": "Ended"},
            "round": {"name": "Final", "round": 7},
            "home_team_id": 11,
            "away_team_id": 12,
            "home_team_score": {"current": 3, "display": 3, "period_1": 6},
            "away_team_score": {"current": 0, "display": 0, "period_1": 4},
            "start_time": "2024-09-08T19:00:00+00:00"
        });

        let detail = flatten_match(&payload).unwrap();
        assert_eq!(detail.round_name.as_deref(), Some("Final"));
        assert_eq!(detail.round_round, Some(7));
        assert_eq!(detail.status_reason.as_deref(), Some("Ended"));
        assert_eq!(detail.home_score.period_1, Some(6));
        assert_eq!(detail.times_period_1, None);

        let summary = detail.summary();
        assert_eq!(summary.score.as_deref(), Some("3-0"));
        assert_eq!(summary.winner_id, Some(11));
    }

    #[test]
    fn match_without_id_is_dropped() {
        assert!(flatten_matches(&[json!({"name": "no id"}), json!({"id": 5})]).len() == 1);
    }

    #[test]
    fn players_get_team_fields_and_age() {
        let payload = vec![json!({
            "team_id": 55,
            "team_name": "Jannik Sinner",
            "players": [
                {"id": 900, "name": "Jannik Sinner", "country_name": "Italy",
                 "player_height": 191, "date_of_birth": "2001-08-16T00:00:00+00:00"},
                {"name": "missing id"}
            ]
        })];
        let today = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();

        let players = flatten_players(&payload, today);
        assert_eq!(players.len(), 1);
        let p = &players[0];
        assert_eq!(p.team_id, Some(55));
        assert_eq!(p.age, Some(23));
        assert_eq!(p.player_height, Some(191));
        assert!(p.win_rate.is_none());
    }
}
