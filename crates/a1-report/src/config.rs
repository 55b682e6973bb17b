//! Report configuration from environment variables

use std::env;
use std::fs;
use std::path::PathBuf;

use tracing::info;

use crate::error::ReportError;
use crate::policy::ClassificationPolicy;

#[derive(Clone, Debug)]
pub struct ReportConfig {
    /// Postgres source for games and sink for summaries
    pub database_url: Option<String>,

    /// JSON working-set file
    pub input: Option<PathBuf>,

    /// ChessReanalysis CSV export directory
    pub cr_export_dir: Option<PathBuf>,

    pub policy: ClassificationPolicy,

    /// Where text reports are written
    pub output_dir: PathBuf,

    /// Classification threads
    pub workers: usize,

    /// Classify games whose analysis is not marked complete
    pub include_incomplete: bool,
}

impl ReportConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ReportError> {
        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());
        let input = env::var("A1_INPUT").ok().map(PathBuf::from);
        let cr_export_dir = env::var("A1_CR_EXPORT_DIR").ok().map(PathBuf::from);

        let output_dir = env::var("REPORT_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        let workers = match env::var("A1_WORKERS") {
            Ok(v) => v
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ReportError::Config("A1_WORKERS must be a positive integer"))?,
            Err(_) => num_cpus::get(),
        };

        let include_incomplete = match env::var("A1_INCLUDE_INCOMPLETE") {
            Ok(v) => parse_flag(&v)
                .ok_or(ReportError::Config("A1_INCLUDE_INCOMPLETE must be true or false"))?,
            Err(_) => false,
        };

        let policy = match env::var("A1_POLICY_FILE") {
            Ok(path) => {
                info!(path = %path, "Loading classification policy");
                let text = fs::read_to_string(&path)?;
                ClassificationPolicy::from_json(&text)
                    .map_err(|_| ReportError::Config("A1_POLICY_FILE is not a valid policy"))?
            }
            Err(_) => ClassificationPolicy::default(),
        };

        Ok(Self {
            database_url,
            input,
            cr_export_dir,
            policy,
            output_dir,
            workers,
            include_incomplete,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" | "" => Some(false),
        _ => None,
    }
}
