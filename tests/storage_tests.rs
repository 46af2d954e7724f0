mod common;

use tokio_test::{assert_err, assert_ok};

use common::{memory_db, odds_row};
use odds_pipeline::config::OddsColumns;
use odds_pipeline::models::{
    GameRecord, MatchDetailRecord, MatchRecord, PlayerRecord, RosterPlayerRecord, TeamRecord,
};
use odds_pipeline::storage;
use odds_pipeline::PipelineError;

#[tokio::test]
async fn initialize_is_idempotent() {
    let db = memory_db(OddsColumns::Players).await;
    assert_ok!(storage::initialize(&db, OddsColumns::Players).await);
    assert_ok!(storage::initialize(&db, OddsColumns::Players).await);

    for table in ["odds", "matches", "match_details", "player_stats", "teams", "players", "games"] {
        assert_eq!(assert_ok!(storage::count_rows(&db, table).await), 0, "{table}");
    }
}

#[tokio::test]
async fn count_rows_rejects_unknown_tables() {
    let db = memory_db(OddsColumns::Players).await;
    let err = assert_err!(storage::count_rows(&db, "odds; DROP TABLE odds").await);
    assert!(matches!(err, PipelineError::Config(_)));
}

#[tokio::test]
async fn odds_round_trip_through_player_columns() {
    let db = memory_db(OddsColumns::Players).await;

    let mut head_to_head = odds_row("Sinner vs Fritz", 1.3);
    head_to_head.market = "h2h".to_string();
    head_to_head.odds_b = Some(3.6);
    let rows = vec![head_to_head, odds_row("Alcaraz", 4.5)];

    assert_eq!(assert_ok!(storage::write_odds(&db, &rows, OddsColumns::Players).await), 2);
    let loaded = assert_ok!(storage::load_odds(&db, OddsColumns::Players).await);
    assert_eq!(loaded, rows);
}

#[tokio::test]
async fn odds_writes_append_duplicates() {
    let db = memory_db(OddsColumns::HomeAwayDraw).await;
    let mut draw = odds_row("Arsenal vs Chelsea", 2.1);
    draw.odds_b = Some(3.4);
    draw.odds_c = Some(3.2);
    let rows = vec![draw];

    assert_ok!(storage::write_odds(&db, &rows, OddsColumns::HomeAwayDraw).await);
    assert_ok!(storage::write_odds(&db, &rows, OddsColumns::HomeAwayDraw).await);

    let loaded = assert_ok!(storage::load_odds(&db, OddsColumns::HomeAwayDraw).await);
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0], loaded[1]);
    assert_eq!(loaded[0].odds_c, Some(3.2));
}

#[tokio::test]
async fn match_upsert_keeps_latest_values() {
    let db = memory_db(OddsColumns::Players).await;
    let mut record = MatchRecord {
        match_id: 42,
        match_date: Some("2024-09-08T20:00:00+00:00".to_string()),
        player1_id: Some(11),
        player2_id: Some(12),
        score: Some("1-0".to_string()),
        winner_id: None,
    };
    assert_ok!(storage::upsert_matches(&db, &[record.clone()]).await);

    record.score = Some("3-1".to_string());
    record.winner_id = Some(11);
    assert_ok!(storage::upsert_matches(&db, &[record.clone()]).await);

    let stored: MatchRecord = sqlx::query_as("SELECT * FROM matches")
        .fetch_one(&db)
        .await
        .unwrap();
    assert_eq!(stored, record);
    assert_eq!(assert_ok!(storage::count_rows(&db, "matches").await), 1);
}

#[tokio::test]
async fn match_batch_is_all_or_nothing() {
    let db = memory_db(OddsColumns::Players).await;
    let detail = MatchDetailRecord {
        id: 7,
        name: Some("Sinner J. - Fritz T.".to_string()),
        status_type: Some("finished".to_string()),
        ..Default::default()
    };
    let summary = detail.summary();

    assert_eq!(
        assert_ok!(storage::upsert_match_batch(&db, &[detail.clone()], &[summary.clone()]).await),
        1
    );
    assert_eq!(assert_ok!(storage::count_rows(&db, "match_details").await), 1);

    // With the summary table gone the second half of the batch fails.
    sqlx::query("DROP TABLE matches").execute(&db).await.unwrap();
    let mut next_detail = detail.clone();
    next_detail.id = 8;
    let mut next_summary = summary;
    next_summary.match_id = 8;

    let err = assert_err!(storage::upsert_match_batch(&db, &[next_detail], &[next_summary]).await);
    assert!(matches!(err, PipelineError::Database(_)));
    assert_eq!(assert_ok!(storage::count_rows(&db, "match_details").await), 1);
}

#[tokio::test]
async fn player_upsert_replaces_by_id() {
    let db = memory_db(OddsColumns::Players).await;
    let mut player = PlayerRecord {
        player_id: 900,
        team_id: Some(55),
        team_name: Some("Italy".to_string()),
        player_name: Some("Jannik Sinner".to_string()),
        country_name: Some("Italy".to_string()),
        player_height: Some(191),
        age: Some(23),
        win_rate: None,
        court_win_rate: None,
        weather_win_rate: None,
    };
    assert_ok!(storage::upsert_players(&db, &[player.clone()]).await);

    player.age = Some(24);
    assert_ok!(storage::upsert_players(&db, &[player.clone()]).await);

    let stored: PlayerRecord = sqlx::query_as("SELECT * FROM player_stats")
        .fetch_one(&db)
        .await
        .unwrap();
    assert_eq!(stored, player);
}

#[tokio::test]
async fn league_tables_upsert() {
    let db = memory_db(OddsColumns::HomeAwayDraw).await;

    let teams = vec![
        TeamRecord {
            team_id: 119,
            name: Some("Los Angeles Dodgers".to_string()),
            abbreviation: Some("LAD".to_string()),
            location: Some("Los Angeles".to_string()),
        },
        TeamRecord {
            team_id: 147,
            name: Some("New York Yankees".to_string()),
            abbreviation: Some("NYY".to_string()),
            location: None,
        },
    ];
    assert_ok!(storage::upsert_teams(&db, &teams).await);
    assert_ok!(storage::upsert_teams(&db, &teams).await);
    assert_eq!(assert_ok!(storage::count_rows(&db, "teams").await), 2);

    let roster = vec![RosterPlayerRecord {
        player_id: 660271,
        full_name: Some("Shohei Ohtani".to_string()),
        team_id: Some(119),
        position: Some("DH".to_string()),
    }];
    assert_ok!(storage::upsert_roster(&db, &roster).await);
    assert_eq!(assert_ok!(storage::count_rows(&db, "players").await), 1);

    let mut game = GameRecord {
        game_id: 775300,
        date: Some("2024-10-25".to_string()),
        home_team_id: Some(119),
        away_team_id: Some(147),
        home_score: None,
        away_score: None,
    };
    assert_ok!(storage::upsert_games(&db, &[game.clone()]).await);
    game.home_score = Some(6);
    game.away_score = Some(3);
    assert_ok!(storage::upsert_games(&db, &[game.clone()]).await);

    let stored: GameRecord = sqlx::query_as("SELECT * FROM games")
        .fetch_one(&db)
        .await
        .unwrap();
    assert_eq!(stored, game);
}
