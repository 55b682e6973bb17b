#![allow(dead_code)]

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use chess_core::game_data::{GameRecord, PlayerInfo, PlyAnalysis, PvLine};
use chess_core::ply::{color_code, color_for_ply, move_number_for_ply};

/// Generate a unique suffix based on timestamp to avoid collisions.
pub fn unique_suffix() -> String {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}", ts % 1_000_000_000)
}

/// Fresh directory under the system temp dir.
pub fn scratch_dir(prefix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("{prefix}-{}", unique_suffix()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn ply(pvs: &[i32], played: i32, rank: Option<u32>) -> PlyAnalysis {
    PlyAnalysis {
        pvs: pvs.iter().map(|cp| PvLine::from_cp(Some(*cp))).collect(),
        played_eval: Some(played),
        played_rank: rank,
    }
}

/// Twelve full moves. Ten quiet book moves each, then:
///
/// - 11. White plays the engine's first choice in a position open at all
///   three tiers (T1-T3 counted and matched, loss 0).
/// - 11... Black misses the only close alternative and loses 60.
/// - 12. White is in a decided position (mate in 3), so nothing counts.
/// - 12... Black faces five equal lines; no tier is counted, loss 0.
pub fn scripted_plies() -> Vec<PlyAnalysis> {
    let mut plies: Vec<PlyAnalysis> = (0..20)
        .map(|i| {
            let eval = if i % 2 == 0 { 15 } else { -15 };
            ply(&[eval], eval, Some(1))
        })
        .collect();
    plies.push(ply(&[80, 60, 30, 10, 0], 80, Some(1)));
    plies.push(ply(&[-40, -60, -200, -300, -400], -100, None));

    let mut mating = ply(&[0], 9970, Some(1));
    mating.pvs[0].score.cp = None;
    mating.pvs[0].score.mate = Some(3);
    plies.push(mating);

    plies.push(ply(&[0, 0, 0, 0, 0], 0, Some(2)));
    plies
}

pub fn game(
    game_id: &str,
    white: (&str, Option<i32>),
    black: (&str, Option<i32>),
    analysis: Vec<PlyAnalysis>,
) -> GameRecord {
    GameRecord {
        game_id: game_id.to_string(),
        white: Some(PlayerInfo::new(white.0, white.1)),
        black: Some(PlayerInfo::new(black.0, black.1)),
        is_completed: true,
        source_pgn: None,
        analysis,
        analysis_error: None,
    }
}

/// `move.csv` rows for `analysis`, in the layout a CR sqlite export writes.
pub fn cr_move_rows(game_id: &str, analysis: &[PlyAnalysis], first_id: usize) -> String {
    let mut out = String::new();
    for (ply, entry) in analysis.iter().enumerate() {
        let mut columns = vec![
            (first_id + ply).to_string(),
            game_id.to_string(),
            color_code(color_for_ply(ply)).to_string(),
            move_number_for_ply(ply).to_string(),
        ];
        for n in 0..5 {
            let eval = entry.pvs.get(n).and_then(|line| line.score.centipawns());
            columns.push(eval.map(|cp| cp.to_string()).unwrap_or_default());
        }
        columns.push(entry.played_eval.map(|cp| cp.to_string()).unwrap_or_default());
        columns.push(entry.played_rank.map(|r| r.to_string()).unwrap_or_default());
        columns.push("4500592".to_string());
        columns.push(String::new());
        out.push_str(&columns.join(","));
        out.push('\n');
    }
    out
}
