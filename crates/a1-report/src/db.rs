//! Database queries for loading analysed games and storing report summaries

use std::collections::HashSet;

use chess_core::game_data::{GameRecord, PlayerInfo, PlyAnalysis};
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{info, warn};

use crate::error::ReportError;
use crate::formatter::ReportSummary;

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(std::time::Duration::from_secs(10))
        .connect(database_url)
        .await
}

/// Create the summary table if it does not exist yet.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;
    Ok(())
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS analysis_crreport (
    id               BIGSERIAL PRIMARY KEY,
    report_name      TEXT NOT NULL,
    scope            TEXT NOT NULL,
    username         TEXT NOT NULL,
    game_id          TEXT,
    sample_size      INTEGER NOT NULL,
    sample_total_cpl BIGINT NOT NULL,
    acpl             DOUBLE PRECISION,
    t1_total         INTEGER NOT NULL,
    t1_count         INTEGER NOT NULL,
    t2_total         INTEGER NOT NULL,
    t2_count         INTEGER NOT NULL,
    t3_total         INTEGER NOT NULL,
    t3_count         INTEGER NOT NULL,
    min_rating       INTEGER,
    max_rating       INTEGER,
    game_list        JSONB NOT NULL,
    cp_loss_count    JSONB NOT NULL,
    cp_loss_total    INTEGER NOT NULL,
    created_at       TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_crreport_name ON analysis_crreport(report_name);
"#;

type GameRow = (String, Option<String>, Option<String>, bool, String, JsonValue);

/// Load the stored analysis for `game_ids`. When a game has several
/// analyses, a completed one is preferred, then the most recent.
pub async fn fetch_games(pool: &PgPool, game_ids: &[String]) -> Result<Vec<GameRecord>, ReportError> {
    let rows: Vec<GameRow> = sqlx::query_as(
        r#"SELECT g.lichess_id, wp.username, bp.username,
                  ga.is_completed, g.source_pgn, ga.analysis
           FROM analysis_gameanalysis ga
           JOIN analysis_game g ON g.id = ga.game_id
           LEFT JOIN analysis_player wp ON wp.id = g.white_player_id
           LEFT JOIN analysis_player bp ON bp.id = g.black_player_id
           WHERE g.lichess_id = ANY($1)
           ORDER BY g.lichess_id, ga.is_completed DESC, ga.id DESC"#,
    )
    .bind(game_ids)
    .fetch_all(pool)
    .await?;

    let mut seen = HashSet::new();
    let mut games = Vec::with_capacity(rows.len());
    for (game_id, white, black, is_completed, source_pgn, analysis) in rows {
        if !seen.insert(game_id.clone()) {
            continue;
        }
        let (analysis, analysis_error) = match serde_json::from_value::<Vec<PlyAnalysis>>(analysis) {
            Ok(analysis) => (analysis, None),
            Err(e) => {
                warn!(game_id = %game_id, error = %e, "Stored analysis is malformed");
                (Vec::new(), Some(e.to_string()))
            }
        };
        games.push(GameRecord {
            game_id,
            white: white.map(|name| PlayerInfo::new(&name, None)),
            black: black.map(|name| PlayerInfo::new(&name, None)),
            is_completed,
            source_pgn: Some(source_pgn).filter(|pgn| !pgn.is_empty()),
            analysis,
            analysis_error,
        });
    }

    info!(requested = game_ids.len(), loaded = games.len(), "Fetched analysed games");
    Ok(games)
}

/// Replace the stored summaries of `report_name` with `summaries`.
pub async fn save_summaries(
    pool: &PgPool,
    report_name: &str,
    summaries: &[ReportSummary],
) -> Result<(), ReportError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM analysis_crreport WHERE report_name = $1")
        .bind(report_name)
        .execute(&mut *tx)
        .await?;

    for summary in summaries {
        sqlx::query(
            r#"INSERT INTO analysis_crreport (
                report_name, scope, username, game_id,
                sample_size, sample_total_cpl, acpl,
                t1_total, t1_count, t2_total, t2_count, t3_total, t3_count,
                min_rating, max_rating, game_list, cp_loss_count, cp_loss_total
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)"#,
        )
        .bind(report_name)
        .bind(summary.scope.as_str())
        .bind(&summary.username)
        .bind(&summary.game_id)
        .bind(summary.sample_size as i32)
        .bind(summary.sample_total_cpl)
        .bind(summary.acpl)
        .bind(summary.t1_total as i32)
        .bind(summary.t1_count as i32)
        .bind(summary.t2_total as i32)
        .bind(summary.t2_count as i32)
        .bind(summary.t3_total as i32)
        .bind(summary.t3_count as i32)
        .bind(summary.min_rating)
        .bind(summary.max_rating)
        .bind(serde_json::to_value(&summary.game_list)?)
        .bind(serde_json::to_value(&summary.cp_loss_count)?)
        .bind(summary.cp_loss_total as i32)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    info!(report_name, rows = summaries.len(), "Saved report summaries");
    Ok(())
}
