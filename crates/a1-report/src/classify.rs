//! Per-move A1 classification for one side of one game.
//!
//! Walks the game's plies in order. The other side's moves only feed the
//! evaluation history used for flat-position detection; the target side's
//! moves are scored for tier matches and centipawn loss.

use shakmaty::Color;

use crate::accumulator::{StatAccumulator, Tier};
use crate::evaluated_move::EvaluatedMove;
use crate::policy::ClassificationPolicy;

/// Consecutive identical evaluations that mark a flat position.
const FLAT_WINDOW: usize = 3;

/// Outcome of evaluating one tier for one move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierOutcome {
    /// A required candidate is missing or the gate failed. Deeper tiers are
    /// not attempted.
    Closed,
    /// Gate passed. `counted` is set when the lower line is strictly worse
    /// than the upper one, i.e. choosing among them was a real decision.
    Open { counted: bool, matched: bool },
}

/// Shared gate for every tier: the neighbouring candidates are within the
/// forced-move threshold of each other, and the deeper one is within the
/// unclear-position threshold of the best move.
pub fn tier_gate(upper: i32, lower: i32, best: i32, policy: &ClassificationPolicy) -> bool {
    let lower = i64::from(lower);
    i64::from(upper) <= lower + i64::from(policy.forced_move_threshold)
        && i64::from(best) <= lower + i64::from(policy.unclear_position_threshold)
}

/// Evaluate `tier` for `mv`, comparing candidate lines `n` and `n + 1`
/// where `n` is the tier depth.
pub fn evaluate_tier(mv: &EvaluatedMove, tier: Tier, policy: &ClassificationPolicy) -> TierOutcome {
    let depth = tier.depth() as usize;
    let (Some(best), Some(upper), Some(lower)) = (mv.pv(1), mv.pv(depth), mv.pv(depth + 1)) else {
        return TierOutcome::Closed;
    };
    if !tier_gate(upper, lower, best, policy) {
        return TierOutcome::Closed;
    }

    let counted = lower < upper;
    TierOutcome::Open {
        counted,
        matched: counted && mv.played_rank.is_within(tier.depth()),
    }
}

/// Classify every move `color` made in one game.
pub fn classify(
    game_id: &str,
    moves: &[EvaluatedMove],
    color: Color,
    policy: &ClassificationPolicy,
) -> StatAccumulator {
    let mut result = StatAccumulator::new();
    result.game_list.push(game_id.to_string());

    // Best-line evaluations of every ply so far, from `color`'s point of view.
    let mut evals: Vec<Option<i32>> = Vec::with_capacity(moves.len());

    for mv in moves {
        let best = mv.best_eval();
        if mv.color != color {
            evals.push(best.map(i32::saturating_neg));
            continue;
        }
        evals.push(best);

        let Some(best) = best else {
            continue;
        };
        if policy.is_book_move(mv.move_number) || policy.is_decided(best) {
            continue;
        }

        for tier in Tier::ALL {
            match evaluate_tier(mv, tier, policy) {
                TierOutcome::Closed => break,
                TierOutcome::Open { counted, matched } => {
                    if counted {
                        result.record_tier_opportunity(tier, matched);
                    }
                }
            }
        }

        let Some(played) = mv.played_eval else {
            continue;
        };
        let cpl = policy.clamp_cpl(i64::from(best) - i64::from(played));
        result.record_cp_loss(cpl);

        if policy.exclude_flat_positions && cpl == 0 && is_flat(&evals, best) {
            continue;
        }
        result.record_sample(cpl);
    }

    result
}

/// The last [`FLAT_WINDOW`] evaluations all equal `eval`.
fn is_flat(evals: &[Option<i32>], eval: i32) -> bool {
    evals.len() >= FLAT_WINDOW
        && evals[evals.len() - FLAT_WINDOW..]
            .iter()
            .all(|e| *e == Some(eval))
}
