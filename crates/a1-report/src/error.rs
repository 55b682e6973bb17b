//! Report error types

use chess_core::cr_import::CrImportError;
use thiserror::Error;

use crate::interval::IntervalError;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Configuration error: {0}")]
    Config(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Interval error: {0}")]
    Interval(#[from] IntervalError),

    #[error("ChessReanalysis import error: {0}")]
    CrImport(#[from] CrImportError),
}
