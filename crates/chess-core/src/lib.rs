//! Shared chess data for the fairplay workspace.
//!
//! Stored engine analysis records, ply/colour conventions, PGN header lookup
//! and the ChessReanalysis export importer.

pub mod cr_import;
pub mod game_data;
pub mod pgn;
pub mod ply;
