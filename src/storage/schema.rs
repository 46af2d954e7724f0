//! Table creation. Idempotent: every statement is `CREATE TABLE IF NOT EXISTS`.
//! There are no migrations; a changed layout needs the table dropped by hand.

use sqlx::SqlitePool;
use tracing::info;

use crate::config::OddsColumns;
use crate::error::Result;

/// `odds` keeps a surrogate AUTOINCREMENT key, so re-ingesting the same
/// event appends rows instead of replacing them.
fn odds_table(columns: OddsColumns) -> String {
    let odds_columns = columns
        .column_names()
        .iter()
        .map(|c| format!("            {} REAL,\n", c))
        .collect::<String>();

    format!(
        r#"
        CREATE TABLE IF NOT EXISTS odds (
            odds_id INTEGER PRIMARY KEY AUTOINCREMENT,
            sport_key TEXT,
            event_id TEXT,
            event_name TEXT,
            bookmaker TEXT,
            market TEXT,
{}            region TEXT,
            timestamp TEXT
        )
        "#,
        odds_columns
    )
}

const MATCHES: &str = r#"
    CREATE TABLE IF NOT EXISTS matches (
        match_id INTEGER PRIMARY KEY,
        match_date TEXT,
        player1_id INTEGER,
        player2_id INTEGER,
        score TEXT,
        winner_id INTEGER
    )
"#;

const MATCH_DETAILS: &str = r#"
    CREATE TABLE IF NOT EXISTS match_details (
        id INTEGER PRIMARY KEY,
        name TEXT,
        first_to_serve INTEGER,
        ground_type TEXT,
        tournament_id INTEGER,
        tournament_name TEXT,
        tournament_importance INTEGER,
        season_id INTEGER,
        season_name TEXT,
        round_id INTEGER,
        round_name TEXT,
        round_round INTEGER,
        round_end_time TEXT,
        round_start_time TEXT,
        status_type TEXT,
        status_reason TEXT,
        arena_id INTEGER,
        arena_name TEXT,
        arena_hash_image TEXT,
        home_team_id INTEGER,
        home_team_name TEXT,
        home_team_hash_image TEXT,
        away_team_id INTEGER,
        away_team_name TEXT,
        away_team_hash_image TEXT,
        home_team_score_current INTEGER,
        home_team_score_display INTEGER,
        home_team_score_period_1 INTEGER,
        home_team_score_period_2 INTEGER,
        home_team_score_default_time INTEGER,
        away_team_score_current INTEGER,
        away_team_score_display INTEGER,
        away_team_score_period_1 INTEGER,
        away_team_score_period_2 INTEGER,
        away_team_score_default_time INTEGER,
        times_period_1 INTEGER,
        times_period_2 INTEGER,
        times_specific_start_time TEXT,
        specific_start_time TEXT,
        start_time TEXT,
        duration INTEGER,
        class_id INTEGER,
        class_name TEXT,
        class_hash_image TEXT,
        league_id INTEGER,
        league_name TEXT,
        league_hash_image TEXT
    )
"#;

const PLAYER_STATS: &str = r#"
    CREATE TABLE IF NOT EXISTS player_stats (
        player_id INTEGER PRIMARY KEY,
        team_id INTEGER,
        team_name TEXT,
        player_name TEXT,
        country_name TEXT,
        player_height INTEGER,
        age INTEGER,
        win_rate REAL,
        court_win_rate REAL,
        weather_win_rate REAL
    )
"#;

const TEAMS: &str = r#"
    CREATE TABLE IF NOT EXISTS teams (
        team_id INTEGER PRIMARY KEY,
        name TEXT,
        abbreviation TEXT,
        location TEXT
    )
"#;

const PLAYERS: &str = r#"
    CREATE TABLE IF NOT EXISTS players (
        player_id INTEGER PRIMARY KEY,
        full_name TEXT,
        team_id INTEGER,
        position TEXT,
        FOREIGN KEY (team_id) REFERENCES teams (team_id)
    )
"#;

const GAMES: &str = r#"
    CREATE TABLE IF NOT EXISTS games (
        game_id INTEGER PRIMARY KEY,
        date TEXT,
        home_team_id INTEGER,
        away_team_id INTEGER,
        home_score INTEGER,
        away_score INTEGER,
        FOREIGN KEY (home_team_id) REFERENCES teams (team_id),
        FOREIGN KEY (away_team_id) REFERENCES teams (team_id)
    )
"#;

/// Create every table the pipeline writes to, if missing.
pub async fn initialize(pool: &SqlitePool, columns: OddsColumns) -> Result<()> {
    sqlx::query(&odds_table(columns)).execute(pool).await?;

    for ddl in [MATCHES, MATCH_DETAILS, PLAYER_STATS, TEAMS, PLAYERS, GAMES] {
        sqlx::query(ddl).execute(pool).await?;
    }

    info!("Database tables initialized ({:?} odds layout)", columns);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn odds_table_uses_layout_columns() {
        let ddl = odds_table(OddsColumns::Players);
        assert!(ddl.contains("odds_player1 REAL"));
        assert!(ddl.contains("odds_player2 REAL"));
        assert!(!ddl.contains("odds_draw"));
        assert!(ddl.contains("AUTOINCREMENT"));

        let ddl = odds_table(OddsColumns::HomeAwayDraw);
        assert!(ddl.contains("odds_draw REAL"));
    }
}
