//! Row writers.
//!
//! Odds rows are appended one INSERT at a time with no transaction around
//! the batch: a failure mid-batch keeps the rows already written. Every
//! other table is keyed by the upstream integer id and written with
//! `INSERT OR REPLACE`, so re-ingestion is last-write-wins.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::config::OddsColumns;
use crate::error::{PipelineError, Result};
use crate::models::{
    GameRecord, MatchDetailRecord, MatchRecord, OddsRow, PlayerRecord, RosterPlayerRecord,
    TeamRecord,
};

const TABLES: &[&str] = &[
    "odds",
    "matches",
    "match_details",
    "player_stats",
    "teams",
    "players",
    "games",
];

fn odds_insert_sql(columns: OddsColumns) -> String {
    let names = columns.column_names();
    let placeholders = vec!["?"; names.len()].join(", ");
    format!(
        "INSERT INTO odds (sport_key, event_id, event_name, bookmaker, market, {}, region, timestamp) \
         VALUES (?, ?, ?, ?, ?, {}, ?, ?)",
        names.join(", "),
        placeholders
    )
}

/// Append odds rows. Returns the number of rows written.
pub async fn write_odds(pool: &SqlitePool, rows: &[OddsRow], columns: OddsColumns) -> Result<usize> {
    if rows.is_empty() {
        return Ok(0);
    }

    let sql = odds_insert_sql(columns);
    let slots = columns.column_names().len();

    for row in rows {
        let prices = [row.odds_a, row.odds_b, row.odds_c];
        let mut query = sqlx::query(&sql)
            .bind(&row.sport_key)
            .bind(&row.event_id)
            .bind(&row.event_name)
            .bind(&row.bookmaker)
            .bind(&row.market);
        for price in &prices[..slots] {
            query = query.bind(*price);
        }
        query
            .bind(&row.region)
            .bind(&row.timestamp)
            .execute(pool)
            .await?;
    }

    info!("Stored {} odds rows", rows.len());
    Ok(rows.len())
}

/// Read every odds row back, mapping the layout's columns onto `odds_a..odds_c`.
pub async fn load_odds(pool: &SqlitePool, columns: OddsColumns) -> Result<Vec<OddsRow>> {
    let names = columns.column_names();
    let select_price = |i: usize| match names.get(i) {
        Some(name) => name.to_string(),
        None => "NULL".to_string(),
    };

    let sql = format!(
        "SELECT sport_key, event_id, event_name, bookmaker, market, \
         {} AS odds_a, {} AS odds_b, {} AS odds_c, region, timestamp \
         FROM odds ORDER BY odds_id",
        select_price(0),
        select_price(1),
        select_price(2)
    );

    let rows = sqlx::query_as::<_, OddsRow>(&sql).fetch_all(pool).await?;
    debug!("Loaded {} odds rows", rows.len());
    Ok(rows)
}

async fn insert_match(conn: &mut SqliteConnection, m: &MatchRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT OR REPLACE INTO matches (
            match_id, match_date, player1_id, player2_id, score, winner_id
        ) VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(m.match_id)
    .bind(&m.match_date)
    .bind(m.player1_id)
    .bind(m.player2_id)
    .bind(&m.score)
    .bind(m.winner_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_match_detail(conn: &mut SqliteConnection, d: &MatchDetailRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT OR REPLACE INTO match_details (
            id, name, first_to_serve, ground_type, tournament_id, tournament_name, tournament_importance,
            season_id, season_name, round_id, round_name, round_round, round_end_time, round_start_time,
            status_type, status_reason, arena_id, arena_name, arena_hash_image,
            home_team_id, home_team_name, home_team_hash_image, away_team_id, away_team_name, away_team_hash_image,
            home_team_score_current, home_team_score_display, home_team_score_period_1, home_team_score_period_2, home_team_score_default_time,
            away_team_score_current, away_team_score_display, away_team_score_period_1, away_team_score_period_2, away_team_score_default_time,
            times_period_1, times_period_2, times_specific_start_time, specific_start_time, start_time, duration,
            class_id, class_name, class_hash_image, league_id, league_name, league_hash_image
        ) VALUES (
            ?, ?, ?, ?, ?, ?, ?,
            ?, ?, ?, ?, ?, ?, ?,
            ?, ?, ?, ?, ?,
            ?, ?, ?, ?, ?, ?,
            ?, ?, ?, ?, ?,
            ?, ?, ?, ?, ?,
            ?, ?, ?, ?, ?, ?,
            ?, ?, ?, ?, ?, ?
        )
        "#,
    )
    .bind(d.id)
    .bind(&d.name)
    .bind(d.first_to_serve)
    .bind(&d.ground_type)
    .bind(d.tournament_id)
    .bind(&d.tournament_name)
    .bind(d.tournament_importance)
    .bind(d.season_id)
    .bind(&d.season_name)
    .bind(d.round_id)
    .bind(&d.round_name)
    .bind(d.round_round)
    .bind(&d.round_end_time)
    .bind(&d.round_start_time)
    .bind(&d.status_type)
    .bind(&d.status_reason)
    .bind(d.arena_id)
    .bind(&d.arena_name)
    .bind(&d.arena_hash_image)
    .bind(d.home_team_id)
    .bind(&d.home_team_name)
    .bind(&d.home_team_hash_image)
    .bind(d.away_team_id)
    .bind(&d.away_team_name)
    .bind(&d.away_team_hash_image)
    .bind(d.home_score.current)
    .bind(d.home_score.display)
    .bind(d.home_score.period_1)
    .bind(d.home_score.period_2)
    .bind(d.home_score.default_time)
    .bind(d.away_score.current)
    .bind(d.away_score.display)
    .bind(d.away_score.period_1)
    .bind(d.away_score.period_2)
    .bind(d.away_score.default_time)
    .bind(d.times_period_1)
    .bind(d.times_period_2)
    .bind(&d.times_specific_start_time)
    .bind(&d.specific_start_time)
    .bind(&d.start_time)
    .bind(d.duration)
    .bind(d.class_id)
    .bind(&d.class_name)
    .bind(&d.class_hash_image)
    .bind(d.league_id)
    .bind(&d.league_name)
    .bind(&d.league_hash_image)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn upsert_matches(pool: &SqlitePool, matches: &[MatchRecord]) -> Result<usize> {
    upsert_match_batch(pool, &[], matches).await
}

pub async fn upsert_match_details(pool: &SqlitePool, details: &[MatchDetailRecord]) -> Result<usize> {
    upsert_match_batch(pool, details, &[]).await?;
    Ok(details.len())
}

/// Upsert match details and their summaries in one transaction, so the two
/// tables never disagree after a failed write. Returns the summary count.
pub async fn upsert_match_batch(
    pool: &SqlitePool,
    details: &[MatchDetailRecord],
    summaries: &[MatchRecord],
) -> Result<usize> {
    if details.is_empty() && summaries.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;

    for d in details {
        insert_match_detail(&mut *tx, d).await?;
    }
    for m in summaries {
        insert_match(&mut *tx, m).await?;
    }

    tx.commit().await?;
    info!(
        "Stored {} match details and {} matches",
        details.len(),
        summaries.len()
    );
    Ok(summaries.len())
}

/// Upsert `player_stats` rows, one statement (and commit) per player.
pub async fn upsert_players(pool: &SqlitePool, players: &[PlayerRecord]) -> Result<usize> {
    for p in players {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO player_stats (
                player_id, team_id, team_name, player_name, country_name, player_height, age,
                win_rate, court_win_rate, weather_win_rate
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(p.player_id)
        .bind(p.team_id)
        .bind(&p.team_name)
        .bind(&p.player_name)
        .bind(&p.country_name)
        .bind(p.player_height)
        .bind(p.age)
        .bind(p.win_rate)
        .bind(p.court_win_rate)
        .bind(p.weather_win_rate)
        .execute(pool)
        .await?;

        info!(
            "Inserted/Updated player '{}' (ID: {}) from team '{}'",
            p.player_name.as_deref().unwrap_or("?"),
            p.player_id,
            p.team_name.as_deref().unwrap_or("?")
        );
    }

    Ok(players.len())
}

pub async fn upsert_teams(pool: &SqlitePool, teams: &[TeamRecord]) -> Result<usize> {
    for t in teams {
        sqlx::query(
            "INSERT OR REPLACE INTO teams (team_id, name, abbreviation, location) VALUES (?, ?, ?, ?)",
        )
        .bind(t.team_id)
        .bind(&t.name)
        .bind(&t.abbreviation)
        .bind(&t.location)
        .execute(pool)
        .await?;
    }
    Ok(teams.len())
}

pub async fn upsert_roster(pool: &SqlitePool, players: &[RosterPlayerRecord]) -> Result<usize> {
    for p in players {
        sqlx::query(
            "INSERT OR REPLACE INTO players (player_id, full_name, team_id, position) VALUES (?, ?, ?, ?)",
        )
        .bind(p.player_id)
        .bind(&p.full_name)
        .bind(p.team_id)
        .bind(&p.position)
        .execute(pool)
        .await?;
    }
    Ok(players.len())
}

pub async fn upsert_games(pool: &SqlitePool, games: &[GameRecord]) -> Result<usize> {
    for g in games {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO games (
                game_id, date, home_team_id, away_team_id, home_score, away_score
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(g.game_id)
        .bind(&g.date)
        .bind(g.home_team_id)
        .bind(g.away_team_id)
        .bind(g.home_score)
        .bind(g.away_score)
        .execute(pool)
        .await?;
    }
    Ok(games.len())
}

/// Row count of one of the pipeline's own tables.
pub async fn count_rows(pool: &SqlitePool, table: &str) -> Result<i64> {
    if !TABLES.contains(&table) {
        return Err(PipelineError::Config(format!("unknown table '{}'", table)));
    }

    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await?;
    Ok(count)
}
