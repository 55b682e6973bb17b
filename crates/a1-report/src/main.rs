//! A1 report generator
//!
//! Loads analysed games from a JSON working set, a ChessReanalysis export or
//! Postgres, classifies every move and writes the text report.

use std::fs;
use std::path::PathBuf;

use a1_report::aggregator::{generate_report_parallel, ReportOptions};
use a1_report::config::ReportConfig;
use a1_report::db;
use a1_report::error::ReportError;
use a1_report::formatter::{game_cps_debug, summary_records, write_text_report};
use chess_core::cr_import::load_cr_export;
use chess_core::game_data::{GameRecord, WorkingSet};
use sqlx::PgPool;
use tracing::{error, info};

#[derive(Debug, Default)]
struct CliArgs {
    game_ids: Vec<String>,
    name: Option<String>,
    input: Option<PathBuf>,
    cr_export: Option<PathBuf>,
    json: bool,
    save: bool,
    debug_cps: bool,
}

/// Parse `--gameids "id1 id2,id3" --name <name> --input <file>
/// --cr-export <dir> --json --save --debug-cps`. `args[0]` is the program.
fn parse_args(args: &[String]) -> Result<CliArgs, ReportError> {
    let mut cli = CliArgs::default();
    let mut rest = args.iter().skip(1);
    while let Some(arg) = rest.next() {
        let mut value = || {
            rest.next().cloned().ok_or_else(|| {
                error!(argument = %arg, "Missing value for command-line argument");
                ReportError::Config("command-line argument is missing its value")
            })
        };
        match arg.as_str() {
            "--gameids" => {
                cli.game_ids = value()?
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect();
            }
            "--name" => cli.name = Some(value()?),
            "--input" => cli.input = Some(PathBuf::from(value()?)),
            "--cr-export" => cli.cr_export = Some(PathBuf::from(value()?)),
            "--json" => cli.json = true,
            "--save" => cli.save = true,
            "--debug-cps" => cli.debug_cps = true,
            other => {
                error!(argument = %other, "Unknown command-line argument");
                return Err(ReportError::Config("unknown command-line argument"));
            }
        }
    }
    Ok(cli)
}

async fn connect(config: &ReportConfig) -> Result<PgPool, ReportError> {
    let url = config
        .database_url
        .as_deref()
        .ok_or(ReportError::Config("DATABASE_URL not set"))?;
    let pool = db::create_pool(url, 2).await?;
    info!("Database connection established");
    Ok(pool)
}

async fn load_games(
    config: &ReportConfig,
    game_ids: &[String],
) -> Result<Vec<GameRecord>, ReportError> {
    if let Some(path) = &config.input {
        info!(path = %path.display(), "Loading working set");
        let working_set: WorkingSet = serde_json::from_str(&fs::read_to_string(path)?)?;
        return Ok(working_set.games);
    }

    if let Some(dir) = &config.cr_export_dir {
        info!(dir = %dir.display(), "Importing ChessReanalysis export");
        return Ok(load_cr_export(dir)?);
    }

    if game_ids.is_empty() {
        return Err(ReportError::Config("--gameids is required when reading from the database"));
    }
    let pool = connect(config).await?;
    db::fetch_games(&pool, game_ids).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Load .env file for local dev
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().collect();
    let cli = parse_args(&args)?;

    let mut config = ReportConfig::load()?;
    if cli.input.is_some() {
        config.input = cli.input.clone();
    }
    if cli.cr_export.is_some() {
        config.cr_export_dir = cli.cr_export.clone();
    }
    info!(
        workers = config.workers,
        include_incomplete = config.include_incomplete,
        "Report config loaded"
    );

    let games = load_games(&config, &cli.game_ids).await?;

    if cli.debug_cps {
        for game in &games {
            if cli.game_ids.is_empty() || cli.game_ids.contains(&game.game_id) {
                println!("# {}", game.game_id);
                print!("{}", game_cps_debug(game));
            }
        }
        return Ok(());
    }

    let options = ReportOptions {
        policy: config.policy,
        include_incomplete: config.include_incomplete,
    };
    let report = generate_report_parallel(&games, &cli.game_ids, &options, config.workers);

    let name = cli.name.as_deref().unwrap_or("a1");
    let path = write_text_report(&report, &config.output_dir, name)?;
    println!("Report written to {}", path.display());

    let summaries = summary_records(&report);
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    }

    if cli.save {
        let pool = connect(&config).await?;
        db::run_migrations(&pool).await?;
        db::save_summaries(&pool, name, &summaries).await?;
    }

    Ok(())
}
