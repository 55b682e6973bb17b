//! Thresholds that drive move classification.

use serde::{Deserialize, Serialize};

/// Full moves treated as opening book and never scored.
pub const DEFAULT_BOOK_DEPTH: u32 = 10;

/// Maximum gap between neighbouring candidates for a tier opportunity.
pub const DEFAULT_FORCED_MOVE_THRESHOLD: i32 = 50;

/// Maximum gap between the best move and a deeper candidate.
pub const DEFAULT_UNCLEAR_POSITION_THRESHOLD: i32 = 100;

/// Positions evaluated at or beyond ± this are decided and never scored.
pub const DEFAULT_UNDECIDED_POSITION_THRESHOLD: i32 = 200;

/// Centipawn loss cap.
pub const DEFAULT_MAX_CPL: i32 = 501;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationPolicy {
    pub book_depth: u32,
    pub forced_move_threshold: i32,
    pub unclear_position_threshold: i32,
    pub undecided_position_threshold: i32,
    pub max_cpl: i32,
    /// Drop zero-loss moves in a run of identical evaluations from ACPL.
    pub exclude_flat_positions: bool,
}

impl Default for ClassificationPolicy {
    fn default() -> Self {
        Self {
            book_depth: DEFAULT_BOOK_DEPTH,
            forced_move_threshold: DEFAULT_FORCED_MOVE_THRESHOLD,
            unclear_position_threshold: DEFAULT_UNCLEAR_POSITION_THRESHOLD,
            undecided_position_threshold: DEFAULT_UNDECIDED_POSITION_THRESHOLD,
            max_cpl: DEFAULT_MAX_CPL,
            exclude_flat_positions: true,
        }
    }
}

impl ClassificationPolicy {
    /// Parse a JSON policy document; absent fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn is_book_move(&self, move_number: u32) -> bool {
        move_number <= self.book_depth
    }

    pub fn is_decided(&self, best_eval: i32) -> bool {
        let threshold = i64::from(self.undecided_position_threshold);
        let best_eval = i64::from(best_eval);
        best_eval <= -threshold || best_eval >= threshold
    }

    /// Raw loss is taken as `i64` so `best - played` cannot overflow.
    pub fn clamp_cpl(&self, raw: i64) -> i32 {
        let capped = raw.min(i64::from(self.max_cpl)).max(0);
        i32::try_from(capped).unwrap_or(self.max_cpl)
    }
}
