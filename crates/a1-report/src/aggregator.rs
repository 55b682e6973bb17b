//! A1 report aggregation across games.
//!
//! Every accepted game is classified once per colour. Each result is merged
//! into the player's running total and into the (player, game) total.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};

use chess_core::game_data::GameRecord;
use serde::Serialize;
use shakmaty::Color;
use tracing::{info, warn};

use crate::accumulator::StatAccumulator;
use crate::classify::classify;
use crate::evaluated_move::evaluated_moves;
use crate::policy::ClassificationPolicy;

/// A player identity. Usernames compare case-insensitively; the first
/// spelling seen is kept for display.
#[derive(Debug, Clone, Serialize)]
pub struct Player {
    pub username: String,
    #[serde(skip)]
    key: String,
}

impl Player {
    pub fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            key: username.trim().to_lowercase(),
        }
    }
}

impl PartialEq for Player {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Player {}

impl Hash for Player {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for Player {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Player {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.username)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// No stored analysis for a requested game, or the analysis is empty.
    NoAnalysis,
    /// Analysis started but was never finished.
    Incomplete,
    /// White or Black has no player identity.
    MissingPlayers,
    /// The game was supplied more than once with different players.
    IdentityConflict,
    /// The stored analysis could not be read.
    MalformedAnalysis,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ExclusionReason::NoAnalysis => "no analysis",
            ExclusionReason::Incomplete => "analysis incomplete",
            ExclusionReason::MissingPlayers => "missing players",
            ExclusionReason::IdentityConflict => "conflicting players",
            ExclusionReason::MalformedAnalysis => "malformed analysis",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExcludedGame {
    pub game_id: String,
    pub reason: ExclusionReason,
}

#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    pub policy: ClassificationPolicy,
    /// Classify games whose analysis is not marked complete.
    pub include_incomplete: bool,
}

#[derive(Debug, Clone, Default)]
pub struct A1Report {
    pub by_player: BTreeMap<Player, StatAccumulator>,
    pub by_game: BTreeMap<(Player, String), StatAccumulator>,
    pub excluded: Vec<ExcludedGame>,
}

impl A1Report {
    /// Players, most suspicious first.
    pub fn players_ranked(&self) -> Vec<(&Player, &StatAccumulator)> {
        let mut entries: Vec<_> = self.by_player.iter().collect();
        entries.sort_by(|a, b| a.1.suspicion_key().total_cmp(&b.1.suspicion_key()));
        entries
    }

    /// (player, game) scopes, most suspicious first.
    pub fn games_ranked(&self) -> Vec<(&(Player, String), &StatAccumulator)> {
        let mut entries: Vec<_> = self.by_game.iter().collect();
        entries.sort_by(|a, b| a.1.suspicion_key().total_cmp(&b.1.suspicion_key()));
        entries
    }

    fn merge(&mut self, player: &Player, game_id: &str, result: &StatAccumulator) {
        self.by_player
            .entry(player.clone())
            .or_default()
            .add(result);
        self.by_game
            .entry((player.clone(), game_id.to_string()))
            .or_default()
            .add(result);
    }
}

/// A game that passed validation, with its resolved players.
struct AcceptedGame<'a> {
    record: &'a GameRecord,
    white: Player,
    black: Player,
}

/// Classification output for one game: (player, colour result) per side.
type GameResult = [(Player, StatAccumulator); 2];

/// Build the A1 report for `requested` game ids. An empty request means
/// every supplied game.
pub fn generate_report(
    games: &[GameRecord],
    requested: &[String],
    options: &ReportOptions,
) -> A1Report {
    let (accepted, excluded) = select_games(games, requested, options);
    let results: Vec<GameResult> = accepted
        .iter()
        .map(|game| classify_game(game, &options.policy))
        .collect();
    reduce(&accepted, results, excluded)
}

/// Same as [`generate_report`], classifying games on `workers` threads. The
/// merge runs on the calling thread in input order.
pub fn generate_report_parallel(
    games: &[GameRecord],
    requested: &[String],
    options: &ReportOptions,
    workers: usize,
) -> A1Report {
    let (accepted, excluded) = select_games(games, requested, options);
    if accepted.is_empty() {
        return reduce(&accepted, Vec::new(), excluded);
    }

    let workers = workers.clamp(1, accepted.len());
    let chunk_size = accepted.len().div_ceil(workers);
    let policy = &options.policy;

    let results: Vec<GameResult> = std::thread::scope(|scope| {
        let handles: Vec<_> = accepted
            .chunks(chunk_size)
            .map(|chunk| {
                scope.spawn(move || {
                    chunk
                        .iter()
                        .map(|game| classify_game(game, policy))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|handle| match handle.join() {
                Ok(chunk) => chunk,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    });

    reduce(&accepted, results, excluded)
}

fn classify_game(game: &AcceptedGame<'_>, policy: &ClassificationPolicy) -> GameResult {
    let record = game.record;
    let moves = evaluated_moves(&record.analysis);

    let side = |color: Color, player: &Player| {
        let mut result = classify(&record.game_id, &moves, color, policy);
        result.with_rating(record.rating(color));
        (player.clone(), result)
    };

    [
        side(Color::White, &game.white),
        side(Color::Black, &game.black),
    ]
}

fn reduce(
    accepted: &[AcceptedGame<'_>],
    results: Vec<GameResult>,
    excluded: Vec<ExcludedGame>,
) -> A1Report {
    let mut report = A1Report {
        excluded,
        ..A1Report::default()
    };

    for (game, sides) in accepted.iter().zip(results) {
        for (player, result) in &sides {
            report.merge(player, &game.record.game_id, result);
        }
    }

    info!(
        games = accepted.len(),
        players = report.by_player.len(),
        excluded = report.excluded.len(),
        "A1 report generated"
    );
    report
}

/// Validate the requested games, returning those to classify (in request
/// order) and those excluded with their reasons.
fn select_games<'a>(
    games: &'a [GameRecord],
    requested: &[String],
    options: &ReportOptions,
) -> (Vec<AcceptedGame<'a>>, Vec<ExcludedGame>) {
    let mut by_id: HashMap<&str, &GameRecord> = HashMap::new();
    let mut conflicted: Vec<&str> = Vec::new();
    let mut order: Vec<&str> = Vec::new();

    for game in games {
        match by_id.get(game.game_id.as_str()) {
            None => {
                by_id.insert(&game.game_id, game);
                order.push(&game.game_id);
            }
            Some(existing) => {
                if !same_players(existing, game) && !conflicted.contains(&game.game_id.as_str()) {
                    conflicted.push(&game.game_id);
                }
            }
        }
    }

    let wanted: Vec<&str> = if requested.is_empty() {
        order
    } else {
        let mut ids: Vec<&str> = Vec::new();
        for id in requested {
            if !ids.contains(&id.as_str()) {
                ids.push(id);
            }
        }
        ids
    };

    let mut accepted = Vec::new();
    let mut excluded = Vec::new();
    let mut exclude = |game_id: &str, reason: ExclusionReason| {
        warn!(game_id, reason = %reason, "Game excluded from A1 report");
        excluded.push(ExcludedGame {
            game_id: game_id.to_string(),
            reason,
        });
    };

    for game_id in wanted {
        let Some(record) = by_id.get(game_id).copied() else {
            exclude(game_id, ExclusionReason::NoAnalysis);
            continue;
        };
        if conflicted.contains(&game_id) {
            exclude(game_id, ExclusionReason::IdentityConflict);
            continue;
        }
        if record.analysis_error.is_some() {
            exclude(game_id, ExclusionReason::MalformedAnalysis);
            continue;
        }
        let (Some(white), Some(black)) = (&record.white, &record.black) else {
            exclude(game_id, ExclusionReason::MissingPlayers);
            continue;
        };
        if record.analysis.is_empty() {
            exclude(game_id, ExclusionReason::NoAnalysis);
            continue;
        }
        if !record.is_completed && !options.include_incomplete {
            exclude(game_id, ExclusionReason::Incomplete);
            continue;
        }

        accepted.push(AcceptedGame {
            record,
            white: Player::new(&white.username),
            black: Player::new(&black.username),
        });
    }

    (accepted, excluded)
}

fn same_players(a: &GameRecord, b: &GameRecord) -> bool {
    let identity = |game: &GameRecord, color: Color| game.player(color).map(|p| Player::new(&p.username));
    identity(a, Color::White) == identity(b, Color::White)
        && identity(a, Color::Black) == identity(b, Color::Black)
}
