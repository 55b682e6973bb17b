pub use chess_core;

pub mod accumulator;
pub mod aggregator;
pub mod classify;
pub mod config;
pub mod db;
pub mod error;
pub mod evaluated_move;
pub mod formatter;
pub mod interval;
pub mod policy;
