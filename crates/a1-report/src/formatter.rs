//! Rendering of A1 reports: the text report file, summary records for the
//! persistence layer, and a per-ply score dump for debugging.

use std::fs;
use std::path::{Path, PathBuf};

use chess_core::game_data::GameRecord;
use chess_core::ply::color_code;
use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use tracing::info;

use crate::accumulator::{StatAccumulator, Tier};
use crate::aggregator::A1Report;
use crate::error::ReportError;
use crate::evaluated_move::{evaluated_moves, MAX_CANDIDATES};
use crate::interval::format_stats;

const PLAYER_HEADER: &str = "------ BY PLAYER ------";
const GAME_HEADER: &str = "------ BY GAME ------";
const EXCLUDED_HEADER: &str = "------ EXCLUDED ------";

/// Render the report as text, most suspicious scopes first.
pub fn render_text(report: &A1Report) -> Result<String, ReportError> {
    let mut out = String::new();

    out.push_str(PLAYER_HEADER);
    out.push_str("\n\n");
    for (player, result) in report.players_ranked() {
        out.push_str(&format!(
            "{player} ({} - {})\n",
            rating(result.min_rating),
            rating(result.max_rating)
        ));
        write_scope(&mut out, result)?;
    }

    out.push('\n');
    out.push_str(GAME_HEADER);
    out.push_str("\n\n");
    for ((player, _), result) in report.games_ranked() {
        out.push_str(&format!("{player} ({})\n", rating(result.min_rating)));
        write_scope(&mut out, result)?;
    }

    if !report.excluded.is_empty() {
        out.push('\n');
        out.push_str(EXCLUDED_HEADER);
        out.push_str("\n\n");
        for excluded in &report.excluded {
            out.push_str(&format!("{}: {}\n", excluded.game_id, excluded.reason));
        }
    }

    Ok(out)
}

fn write_scope(out: &mut String, result: &StatAccumulator) -> Result<(), ReportError> {
    for tier in Tier::ALL {
        let total = result.tier_total(tier);
        if total > 0 {
            let stats = format_stats(result.tier_matches(tier), total)?;
            out.push_str(&format!("{}: {stats}\n", tier.label()));
        }
    }

    if let Some(acpl) = result.acpl() {
        out.push_str(&format!("ACPL: {acpl:.1} ({})\n", result.sample_size));
    }

    let total = result.cp_loss_total;
    if total > 0 {
        for (label, count) in result.cp_loss_counts() {
            let stats = format_stats(count, total)?;
            out.push_str(&format!("  {label} CP loss: {stats}\n"));
        }
    }

    out.push_str(&result.game_list.join(" "));
    out.push_str("\n\n");
    Ok(())
}

fn rating(value: Option<i32>) -> String {
    value.map(|r| r.to_string()).unwrap_or_else(|| "?".to_string())
}

/// `report-a1--2024-03-01--14-05-09--<name>.txt`
pub fn report_file_name(name: &str, timestamp: NaiveDateTime) -> String {
    format!(
        "report-a1--{}--{name}.txt",
        timestamp.format("%Y-%m-%d--%H-%M-%S")
    )
}

/// Write the text report into `dir`, returning the file path.
pub fn write_text_report(
    report: &A1Report,
    dir: &Path,
    name: &str,
) -> Result<PathBuf, ReportError> {
    let text = render_text(report)?;
    fs::create_dir_all(dir)?;
    let path = dir.join(report_file_name(name, Local::now().naive_local()));
    fs::write(&path, text)?;
    info!(path = %path.display(), "Wrote A1 report");
    Ok(path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryScope {
    Player,
    Game,
}

impl SummaryScope {
    pub fn as_str(self) -> &'static str {
        match self {
            SummaryScope::Player => "player",
            SummaryScope::Game => "game",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CpLossCount {
    pub title: String,
    pub count: u32,
}

/// One persisted row per report scope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub scope: SummaryScope,
    pub username: String,
    pub game_id: Option<String>,
    pub sample_size: u32,
    pub sample_total_cpl: i64,
    pub acpl: Option<f64>,
    pub t1_total: u32,
    pub t1_count: u32,
    pub t2_total: u32,
    pub t2_count: u32,
    pub t3_total: u32,
    pub t3_count: u32,
    pub min_rating: Option<i32>,
    pub max_rating: Option<i32>,
    pub game_list: Vec<String>,
    pub cp_loss_count: Vec<CpLossCount>,
    pub cp_loss_total: u32,
}

impl ReportSummary {
    fn new(
        scope: SummaryScope,
        username: &str,
        game_id: Option<&str>,
        result: &StatAccumulator,
    ) -> Self {
        Self {
            scope,
            username: username.to_string(),
            game_id: game_id.map(String::from),
            sample_size: result.sample_size,
            sample_total_cpl: result.sample_total_cpl,
            acpl: result.acpl(),
            t1_total: result.tier_total(Tier::T1),
            t1_count: result.tier_matches(Tier::T1),
            t2_total: result.tier_total(Tier::T2),
            t2_count: result.tier_matches(Tier::T2),
            t3_total: result.tier_total(Tier::T3),
            t3_count: result.tier_matches(Tier::T3),
            min_rating: result.min_rating,
            max_rating: result.max_rating,
            game_list: result.game_list.clone(),
            cp_loss_count: result
                .cp_loss_counts()
                .into_iter()
                .map(|(title, count)| CpLossCount { title, count })
                .collect(),
            cp_loss_total: result.cp_loss_total,
        }
    }
}

/// Player summaries followed by (player, game) summaries, each in rank order.
pub fn summary_records(report: &A1Report) -> Vec<ReportSummary> {
    let players = report
        .players_ranked()
        .into_iter()
        .map(|(player, result)| {
            ReportSummary::new(SummaryScope::Player, &player.username, None, result)
        });
    let games = report
        .games_ranked()
        .into_iter()
        .map(|((player, game_id), result)| {
            ReportSummary::new(SummaryScope::Game, &player.username, Some(game_id.as_str()), result)
        });
    players.chain(games).collect()
}

/// `color,number,pv1,...,pv5` for every ply, in the column order a
/// ChessReanalysis `move` table dump uses. Missing scores are left empty.
pub fn game_cps_debug(game: &GameRecord) -> String {
    let mut out = String::new();
    for mv in evaluated_moves(&game.analysis) {
        let mut columns = vec![
            color_code(mv.color).to_string(),
            mv.move_number.to_string(),
        ];
        for n in 1..=MAX_CANDIDATES {
            columns.push(mv.pv(n).map(|cp| cp.to_string()).unwrap_or_default());
        }
        out.push_str(&columns.join(","));
        out.push('\n');
    }
    out
}
