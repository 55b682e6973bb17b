//! Ply numbering.
//!
//! Plies are zero-based: ply 0 is White's first move, ply 1 Black's reply.
//! Full-move numbers start at 1.

use shakmaty::Color;

/// Side that makes the move at `ply`.
pub fn color_for_ply(ply: usize) -> Color {
    if ply % 2 == 0 {
        Color::White
    } else {
        Color::Black
    }
}

/// Full-move number of `ply`.
pub fn move_number_for_ply(ply: usize) -> u32 {
    (ply / 2) as u32 + 1
}

/// Ply index of `color`'s move in full move `number`.
/// Returns `None` for move number 0.
pub fn ply_for_color_move(color: Color, number: u32) -> Option<usize> {
    let number = number.checked_sub(1)? as usize;
    Some(match color {
        Color::White => number * 2,
        Color::Black => number * 2 + 1,
    })
}

/// Parse the single-letter colour code used by ChessReanalysis (`w`/`b`).
pub fn parse_color_code(code: &str) -> Option<Color> {
    match code.trim() {
        "w" | "W" => Some(Color::White),
        "b" | "B" => Some(Color::Black),
        _ => None,
    }
}

pub fn color_code(color: Color) -> char {
    match color {
        Color::White => 'w',
        Color::Black => 'b',
    }
}
