//! PGN header lookup. Move text is never parsed here.

use regex::Regex;
use shakmaty::Color;

/// Rating of `color` from the `WhiteElo`/`BlackElo` header. Placeholders
/// such as `"?"` read as absent.
pub fn header_rating(pgn: &str, color: Color) -> Option<i32> {
    let tag = match color {
        Color::White => "WhiteElo",
        Color::Black => "BlackElo",
    };
    let re = Regex::new(&format!(r#"\[{tag}\s+"(\d+)"\]"#)).ok()?;
    re.captures(pgn)?.get(1)?.as_str().parse().ok()
}
