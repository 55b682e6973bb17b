//! Per-ply engine evaluations in the form the classifier consumes.

use chess_core::game_data::PlyAnalysis;
use chess_core::ply::{color_for_ply, move_number_for_ply};
use shakmaty::Color;

/// Candidate lines considered per ply.
pub const MAX_CANDIDATES: usize = 5;

/// Where the played move sits among the engine's candidate lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayedRank {
    /// 1-based position among the candidates.
    Ranked(u8),
    /// Not one of the candidates, or no rank was recorded.
    Unranked,
}

impl PlayedRank {
    /// Normalise a stored rank against the number of candidate lines.
    pub fn from_stored(rank: Option<u32>, candidates: usize) -> Self {
        match rank {
            Some(r) if r >= 1 && (r as usize) <= candidates => PlayedRank::Ranked(r as u8),
            _ => PlayedRank::Unranked,
        }
    }

    pub fn is_within(self, depth: u8) -> bool {
        matches!(self, PlayedRank::Ranked(r) if r <= depth)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluatedMove {
    pub ply_index: usize,
    pub color: Color,
    pub move_number: u32,
    /// Best first, mover's point of view.
    pub candidate_evals: Vec<Option<i32>>,
    pub played_eval: Option<i32>,
    pub played_rank: PlayedRank,
}

impl EvaluatedMove {
    pub fn new(
        ply_index: usize,
        candidate_evals: Vec<Option<i32>>,
        played_eval: Option<i32>,
        played_rank: Option<u32>,
    ) -> Self {
        let played_rank = PlayedRank::from_stored(played_rank, candidate_evals.len());
        Self {
            ply_index,
            color: color_for_ply(ply_index),
            move_number: move_number_for_ply(ply_index),
            candidate_evals,
            played_eval,
            played_rank,
        }
    }

    pub fn from_analysis(ply_index: usize, analysis: &PlyAnalysis) -> Self {
        let candidates = analysis
            .pvs
            .iter()
            .take(MAX_CANDIDATES)
            .map(|line| line.score.centipawns())
            .collect();
        Self::new(
            ply_index,
            candidates,
            analysis.played_eval,
            analysis.played_rank,
        )
    }

    /// Evaluation of the `n`th best line (1-based), if the engine gave one.
    pub fn pv(&self, n: usize) -> Option<i32> {
        n.checked_sub(1)
            .and_then(|i| self.candidate_evals.get(i).copied().flatten())
    }

    pub fn best_eval(&self) -> Option<i32> {
        self.pv(1)
    }
}

/// Build the move sequence for one game.
pub fn evaluated_moves(analysis: &[PlyAnalysis]) -> Vec<EvaluatedMove> {
    analysis
        .iter()
        .enumerate()
        .map(|(ply, entry)| EvaluatedMove::from_analysis(ply, entry))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::game_data::{PvLine, PvScore};

    #[test]
    fn test_rank_normalisation() {
        assert_eq!(PlayedRank::from_stored(Some(1), 5), PlayedRank::Ranked(1));
        assert_eq!(PlayedRank::from_stored(Some(5), 5), PlayedRank::Ranked(5));
        // len + 1 was the legacy "outside the top lines" marker
        assert_eq!(PlayedRank::from_stored(Some(6), 5), PlayedRank::Unranked);
        assert_eq!(PlayedRank::from_stored(Some(3), 2), PlayedRank::Unranked);
        assert_eq!(PlayedRank::from_stored(Some(0), 5), PlayedRank::Unranked);
        assert_eq!(PlayedRank::from_stored(None, 5), PlayedRank::Unranked);
    }

    #[test]
    fn test_rank_depth() {
        assert!(PlayedRank::Ranked(1).is_within(1));
        assert!(PlayedRank::Ranked(2).is_within(3));
        assert!(!PlayedRank::Ranked(3).is_within(2));
        assert!(!PlayedRank::Unranked.is_within(3));
    }

    #[test]
    fn test_from_analysis() {
        let mut pvs: Vec<PvLine> = [40, 35, 10, -5, -20, -90]
            .iter()
            .map(|cp| PvLine::from_cp(Some(*cp)))
            .collect();
        pvs[2].score = PvScore { cp: None, mate: None };
        let analysis = PlyAnalysis {
            pvs,
            played_eval: Some(35),
            played_rank: Some(2),
        };

        let mv = EvaluatedMove::from_analysis(21, &analysis);
        assert_eq!(mv.color, Color::Black);
        assert_eq!(mv.move_number, 11);
        assert_eq!(mv.candidate_evals.len(), MAX_CANDIDATES);
        assert_eq!(mv.pv(1), Some(40));
        assert_eq!(mv.pv(3), None);
        assert_eq!(mv.pv(5), Some(-20));
        assert_eq!(mv.pv(6), None);
        assert_eq!(mv.pv(0), None);
        assert_eq!(mv.played_rank, PlayedRank::Ranked(2));
    }

    #[test]
    fn test_evaluated_moves_numbering() {
        let analysis = vec![PlyAnalysis::default(); 3];
        let moves = evaluated_moves(&analysis);
        let numbered: Vec<(Color, u32)> = moves.iter().map(|m| (m.color, m.move_number)).collect();
        assert_eq!(
            numbered,
            vec![(Color::White, 1), (Color::Black, 1), (Color::White, 2)]
        );
        assert!(moves.iter().all(|m| m.best_eval().is_none()));
    }
}
