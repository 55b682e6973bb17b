//! Importer for ChessReanalysis database exports.
//!
//! A CR sqlite database exported with `.mode csv` / `.headers off` yields four
//! headerless files:
//!
//! - `player.csv`:     id, username
//! - `gameplayer.csv`: id, game_id, color, player_id
//! - `game.csv`:       id, is_analyzed
//! - `move.csv`:       id, game_id, color, number, pv1_eval..pv5_eval,
//!                     played_eval, played_rank, nodes, masterdb_matches
//!
//! CR addresses moves by (colour, full-move number); they are placed into the
//! zero-based ply list with [`ply_for_color_move`].

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use shakmaty::Color;
use thiserror::Error;
use tracing::warn;

use crate::game_data::{GameRecord, PlayerInfo, PlyAnalysis, PvLine};
use crate::ply::{parse_color_code, ply_for_color_move};

pub const PLAYER_FILE: &str = "player.csv";
pub const GAMEPLAYER_FILE: &str = "gameplayer.csv";
pub const GAME_FILE: &str = "game.csv";
pub const MOVE_FILE: &str = "move.csv";

const MOVE_COLUMNS: usize = 13;

/// Longest possible game under the 75-move rule is under 6000 moves.
const MAX_MOVE_NUMBER: u32 = 6000;

#[derive(Error, Debug)]
pub enum CrImportError {
    #[error("Failed to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {file}: {source}")]
    Csv {
        file: &'static str,
        #[source]
        source: csv::Error,
    },

    #[error("{file} line {line}: {message}")]
    MalformedRow {
        file: &'static str,
        line: u64,
        message: String,
    },

    #[error("Game {game_id} references unknown player id {player_id}")]
    UnknownPlayer { game_id: String, player_id: String },
}

/// Load an export directory containing the four CR csv files.
pub fn load_cr_export(dir: &Path) -> Result<Vec<GameRecord>, CrImportError> {
    let open = |name: &str| {
        let path = dir.join(name);
        File::open(&path).map_err(|source| CrImportError::Io {
            path: path.display().to_string(),
            source,
        })
    };

    parse_cr_export(
        open(PLAYER_FILE)?,
        open(GAMEPLAYER_FILE)?,
        open(GAME_FILE)?,
        open(MOVE_FILE)?,
    )
}

/// Join the four CR tables into game records, in `game.csv` order. Games that
/// only appear in `move.csv` are appended afterwards as not completed.
///
/// Row-level problems do not abort the import. Unreadable player, seat and
/// game rows are logged and skipped; a seat naming an unknown player is left
/// empty; a game with an unreadable move row keeps the error in
/// [`GameRecord::analysis_error`].
pub fn parse_cr_export(
    players: impl Read,
    gameplayers: impl Read,
    games: impl Read,
    moves: impl Read,
) -> Result<Vec<GameRecord>, CrImportError> {
    let mut usernames: HashMap<String, String> = HashMap::new();
    for record in read_rows(PLAYER_FILE, players)? {
        match (field(PLAYER_FILE, &record, 0), field(PLAYER_FILE, &record, 1)) {
            (Ok(id), Ok(username)) => {
                usernames.insert(id.to_string(), username.to_string());
            }
            (Err(e), _) | (_, Err(e)) => warn!(error = %e, "Skipping player row"),
        }
    }

    let mut seats: HashMap<String, (Option<PlayerInfo>, Option<PlayerInfo>)> = HashMap::new();
    for record in read_rows(GAMEPLAYER_FILE, gameplayers)? {
        let (game_id, color, player_id) = match parse_seat(&record) {
            Ok(seat) => seat,
            Err(e) => {
                warn!(error = %e, "Skipping game player row");
                continue;
            }
        };
        let seat = seats.entry(game_id.to_string()).or_default();
        let Some(username) = usernames.get(player_id) else {
            let e = CrImportError::UnknownPlayer {
                game_id: game_id.to_string(),
                player_id: player_id.to_string(),
            };
            warn!(error = %e, "Leaving seat empty");
            continue;
        };

        let player = Some(PlayerInfo::new(username, None));
        match color {
            Color::White => seat.0 = player,
            Color::Black => seat.1 = player,
        }
    }

    let mut order: Vec<(String, bool)> = Vec::new();
    for record in read_rows(GAME_FILE, games)? {
        match (field(GAME_FILE, &record, 0), field(GAME_FILE, &record, 1)) {
            (Ok(game_id), Ok(analyzed)) => order.push((game_id.to_string(), analyzed == "1")),
            (Err(e), _) | (_, Err(e)) => warn!(error = %e, "Skipping game row"),
        }
    }

    let mut plies: BTreeMap<String, BTreeMap<usize, PlyAnalysis>> = BTreeMap::new();
    let mut broken: HashMap<String, String> = HashMap::new();
    for record in read_rows(MOVE_FILE, moves)? {
        let game_id = match field(MOVE_FILE, &record, 1) {
            Ok(game_id) if !game_id.is_empty() => game_id,
            Ok(_) => {
                warn!(error = %malformed(MOVE_FILE, &record, "empty game id"), "Skipping move row");
                continue;
            }
            Err(e) => {
                warn!(error = %e, "Skipping move row");
                continue;
            }
        };
        let by_ply = plies.entry(game_id.to_string()).or_default();
        match parse_move(&record) {
            Ok((ply, entry)) => {
                by_ply.insert(ply, entry);
            }
            Err(e) => {
                warn!(game_id, error = %e, "Game has an unreadable move row");
                broken.entry(game_id.to_string()).or_insert_with(|| e.to_string());
            }
        }
    }

    for game_id in plies.keys() {
        if !order.iter().any(|(id, _)| id == game_id) {
            order.push((game_id.clone(), false));
        }
    }

    Ok(order
        .into_iter()
        .map(|(game_id, is_completed)| {
            let (white, black) = seats.remove(&game_id).unwrap_or_default();
            let analysis = plies.remove(&game_id).map(densify).unwrap_or_default();
            let analysis_error = broken.remove(&game_id);
            GameRecord {
                game_id,
                white,
                black,
                is_completed,
                source_pgn: None,
                analysis,
                analysis_error,
            }
        })
        .collect())
}

/// `gameplayer.csv` row: (game id, colour, player id).
fn parse_seat(record: &StringRecord) -> Result<(&str, Color, &str), CrImportError> {
    let game_id = field(GAMEPLAYER_FILE, record, 1)?;
    let color = parse_color_code(field(GAMEPLAYER_FILE, record, 2)?)
        .ok_or_else(|| malformed(GAMEPLAYER_FILE, record, "invalid color"))?;
    let player_id = field(GAMEPLAYER_FILE, record, 3)?;
    Ok((game_id, color, player_id))
}

/// `move.csv` row: the ply it belongs to and its analysis.
fn parse_move(record: &StringRecord) -> Result<(usize, PlyAnalysis), CrImportError> {
    if record.len() < MOVE_COLUMNS {
        return Err(malformed(MOVE_FILE, record, "expected 13 columns"));
    }
    let color = parse_color_code(field(MOVE_FILE, record, 2)?)
        .ok_or_else(|| malformed(MOVE_FILE, record, "invalid color"))?;
    let number: u32 = field(MOVE_FILE, record, 3)?
        .parse()
        .map_err(|_| malformed(MOVE_FILE, record, "invalid move number"))?;
    if number > MAX_MOVE_NUMBER {
        return Err(malformed(MOVE_FILE, record, &format!("move number {number} out of range")));
    }
    let ply = ply_for_color_move(color, number)
        .ok_or_else(|| malformed(MOVE_FILE, record, "move number must start at 1"))?;

    let mut pvs = Vec::with_capacity(5);
    for column in 4..9 {
        pvs.push(PvLine::from_cp(optional_int(record, column)?));
    }
    let played_rank = optional_int(record, 10)?.map(|rank| u32::try_from(rank).unwrap_or(0));

    Ok((
        ply,
        PlyAnalysis {
            pvs,
            played_eval: optional_int(record, 9)?,
            played_rank,
        },
    ))
}

/// Fill ply gaps with empty analysis so list index == ply index.
fn densify(by_ply: BTreeMap<usize, PlyAnalysis>) -> Vec<PlyAnalysis> {
    let len = by_ply.keys().next_back().map(|last| last + 1).unwrap_or(0);
    let mut analysis = vec![PlyAnalysis::default(); len];
    for (ply, entry) in by_ply {
        analysis[ply] = entry;
    }
    analysis
}

/// Every parsable record of `input`. Undecodable records are logged and
/// skipped; read failures abort.
fn read_rows(file: &'static str, input: impl Read) -> Result<Vec<StringRecord>, CrImportError> {
    let mut rows = Vec::new();
    for result in ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(input)
        .into_records()
    {
        match result {
            Ok(record) => rows.push(record),
            Err(source) if source.is_io_error() => return Err(CrImportError::Csv { file, source }),
            Err(e) => warn!(file, error = %e, "Skipping unreadable row"),
        }
    }
    Ok(rows)
}

fn field<'r>(
    file: &'static str,
    record: &'r StringRecord,
    index: usize,
) -> Result<&'r str, CrImportError> {
    record
        .get(index)
        .ok_or_else(|| malformed(file, record, &format!("missing column {}", index + 1)))
}

/// Nullable integer column: empty and `NULL` mean absent.
fn optional_int(record: &StringRecord, index: usize) -> Result<Option<i32>, CrImportError> {
    match record.get(index).unwrap_or("") {
        "" | "NULL" => Ok(None),
        value => value
            .parse()
            .map(Some)
            .map_err(|_| malformed(MOVE_FILE, record, &format!("invalid integer {value:?}"))),
    }
}

fn malformed(file: &'static str, record: &StringRecord, message: &str) -> CrImportError {
    CrImportError::MalformedRow {
        file,
        line: record.position().map(|p| p.line()).unwrap_or(0),
        message: message.to_string(),
    }
}
