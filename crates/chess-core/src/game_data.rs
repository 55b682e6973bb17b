//! Stored analysis records as supplied by the game registry.

use serde::{Deserialize, Deserializer, Serialize};
use shakmaty::Color;

use crate::pgn;

/// Centipawn magnitude used to express a forced mate.
pub const MATE_SCORE: i32 = 10000;

/// Integer column as the registry stores it: a JSON number, a numeric
/// string (ChessReanalysis imports keep the raw csv text), or `""`/`null`
/// for a missing value. Unparsable text reads as missing.
fn lenient_int<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Stored {
        Int(i64),
        Float(f64),
        Text(String),
    }

    let value = match Option::<Stored>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(Stored::Int(v)) => v,
        Some(Stored::Float(v)) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => v as i64,
        Some(Stored::Float(_)) => return Ok(None),
        Some(Stored::Text(text)) => match text.trim().parse::<i64>() {
            Ok(v) => v,
            Err(_) => return Ok(None),
        },
    };
    T::try_from(value)
        .map(Some)
        .map_err(|_| serde::de::Error::custom(format!("integer {value} out of range")))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PvScore {
    #[serde(default, deserialize_with = "lenient_int")]
    pub cp: Option<i32>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub mate: Option<i32>,
}

impl PvScore {
    pub fn cp(cp: i32) -> Self {
        Self {
            cp: Some(cp),
            mate: None,
        }
    }

    /// Single centipawn value for this score, mover's point of view.
    /// Mates are mapped onto the ±10000 scale, shorter mates scoring higher.
    /// Very long mates bottom out at 0 rather than changing sign.
    pub fn centipawns(&self) -> Option<i32> {
        if let Some(cp) = self.cp {
            return Some(cp);
        }
        let mate = i64::from(MATE_SCORE);
        let score = match self.mate {
            Some(m) if m > 0 => (mate - i64::from(m) * 10).max(0),
            Some(m) if m < 0 => (-mate - i64::from(m) * 10).min(0),
            _ => return None,
        };
        i32::try_from(score).ok()
    }
}

/// One candidate line reported by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PvLine {
    #[serde(default)]
    pub pv: String,
    #[serde(default)]
    pub score: PvScore,
}

impl PvLine {
    pub fn from_cp(cp: Option<i32>) -> Self {
        Self {
            pv: String::new(),
            score: PvScore { cp, mate: None },
        }
    }
}

/// Engine analysis of a single ply: candidate lines best first, plus the
/// evaluation and rank of the move actually played.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlyAnalysis {
    #[serde(default)]
    pub pvs: Vec<PvLine>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub played_eval: Option<i32>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub played_rank: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub username: String,
    #[serde(default)]
    pub rating: Option<i32>,
}

impl PlayerInfo {
    pub fn new(username: &str, rating: Option<i32>) -> Self {
        Self {
            username: username.to_string(),
            rating,
        }
    }
}

/// A game as known to the registry, with its stored analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: String,
    #[serde(default)]
    pub white: Option<PlayerInfo>,
    #[serde(default)]
    pub black: Option<PlayerInfo>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub source_pgn: Option<String>,
    #[serde(default)]
    pub analysis: Vec<PlyAnalysis>,
    /// Set when the stored analysis could not be read; such games are
    /// reported but never classified.
    #[serde(skip)]
    pub analysis_error: Option<String>,
}

impl GameRecord {
    pub fn player(&self, color: Color) -> Option<&PlayerInfo> {
        match color {
            Color::White => self.white.as_ref(),
            Color::Black => self.black.as_ref(),
        }
    }

    /// Registry rating for `color`, falling back to the Elo header of the
    /// stored PGN.
    pub fn rating(&self, color: Color) -> Option<i32> {
        if let Some(rating) = self.player(color).and_then(|p| p.rating) {
            return Some(rating);
        }
        self.source_pgn
            .as_deref()
            .and_then(|text| pgn::header_rating(text, color))
    }
}

/// The document read from a JSON input file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkingSet {
    pub games: Vec<GameRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mate_scores() {
        assert_eq!(PvScore::cp(35).centipawns(), Some(35));
        let mate_in_two = PvScore { cp: None, mate: Some(2) };
        assert_eq!(mate_in_two.centipawns(), Some(9980));
        let mated_in_three = PvScore { cp: None, mate: Some(-3) };
        assert_eq!(mated_in_three.centipawns(), Some(-9970));
        assert_eq!(PvScore::default().centipawns(), None);
    }

    #[test]
    fn test_extreme_mate_scores_stay_in_range() {
        let long_mate = PvScore { cp: None, mate: Some(i32::MAX) };
        assert_eq!(long_mate.centipawns(), Some(0));
        let long_mated = PvScore { cp: None, mate: Some(i32::MIN) };
        assert_eq!(long_mated.centipawns(), Some(0));
        let mated_in_999 = PvScore { cp: None, mate: Some(-999) };
        assert_eq!(mated_in_999.centipawns(), Some(-10));
    }

    #[test]
    fn test_deserialize_imported_text_columns() {
        // ChessReanalysis imports store the csv text as-is.
        let json = r#"[
            {"move": 1, "cr": {},
             "pvs": [{"pv": "", "score": {"cp": "30", "mate": null}},
                     {"pv": "", "score": {"cp": "", "mate": null}}],
             "played_eval": "30", "played_rank": "1"},
            {"move": 2, "cr": {},
             "pvs": [{"pv": "", "score": {"cp": " -25 ", "mate": null}}],
             "played_eval": "-90", "played_rank": "", "nodes": "4500592"},
            {"move": 3, "pvs": [{"pv": "", "score": {"cp": 12.0}}],
             "played_eval": null, "played_rank": "n/a"}
        ]"#;
        let plies: Vec<PlyAnalysis> = serde_json::from_str(json).unwrap();

        assert_eq!(plies[0].pvs[0].score.cp, Some(30));
        assert_eq!(plies[0].pvs[1].score.cp, None);
        assert_eq!(plies[0].played_eval, Some(30));
        assert_eq!(plies[0].played_rank, Some(1));

        assert_eq!(plies[1].pvs[0].score.cp, Some(-25));
        assert_eq!(plies[1].played_eval, Some(-90));
        assert_eq!(plies[1].played_rank, None);

        assert_eq!(plies[2].pvs[0].score.cp, Some(12));
        assert_eq!(plies[2].played_eval, None);
        assert_eq!(plies[2].played_rank, None);
    }

    #[test]
    fn test_out_of_range_column_is_an_error() {
        let json = r#"{"pvs": [], "played_rank": "-1"}"#;
        assert!(serde_json::from_str::<PlyAnalysis>(json).is_err());
        let json = r#"{"pvs": [], "played_eval": 99999999999}"#;
        assert!(serde_json::from_str::<PlyAnalysis>(json).is_err());
    }

    #[test]
    fn test_deserialize_stored_analysis() {
        let json = r#"{
            "game_id": "UjjpxfT2",
            "white": {"username": "dotaautochess", "rating": 1850},
            "black": null,
            "is_completed": true,
            "analysis": [
                {"pvs": [{"pv": "e2e4 e7e5", "score": {"cp": 24, "mate": null}}],
                 "played_eval": 24, "played_rank": 1},
                {"pvs": []}
            ]
        }"#;
        let game: GameRecord = serde_json::from_str(json).unwrap();
        assert_eq!(game.analysis.len(), 2);
        assert_eq!(game.analysis[0].pvs[0].score.cp, Some(24));
        assert_eq!(game.analysis[1].played_rank, None);
        assert!(game.black.is_none());
        assert_eq!(game.rating(Color::White), Some(1850));
    }

    #[test]
    fn test_rating_falls_back_to_pgn_header() {
        let game = GameRecord {
            game_id: "abc".to_string(),
            white: Some(PlayerInfo::new("alice", None)),
            black: Some(PlayerInfo::new("bob", Some(1400))),
            is_completed: true,
            source_pgn: Some("[WhiteElo \"1720\"]\n[BlackElo \"1650\"]".to_string()),
            analysis: Vec::new(),
            analysis_error: None,
        };
        assert_eq!(game.rating(Color::White), Some(1720));
        assert_eq!(game.rating(Color::Black), Some(1400));
    }
}
