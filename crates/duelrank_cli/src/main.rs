//! Leaderboard printer.
//!
//! Loads configuration, starts logging, opens the ledger and prints the
//! per-category leaderboard followed by the overall top list.

use clap::Parser;
use duelrank_core::db::{open_db, open_db_in_memory};
use duelrank_core::{
    core_version, init_logging_from_config, EngineConfig, LeaderboardRequest,
    LeaderboardService, RankedSubmission, SqliteSubmissionRepository,
};
use log::error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "duelrank_cli",
    version,
    about = "Print pairwise-comparison leaderboards from a rating ledger"
)]
struct Cli {
    /// JSON engine config; defaults apply when omitted (in-memory ledger)
    config: Option<PathBuf>,

    /// Rows in the overall list (0 uses the configured default)
    #[arg(long, default_value_t = 0)]
    limit: u32,

    /// Rows per category (0 uses the configured default)
    #[arg(long, default_value_t = 0)]
    per_category: u32,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_exit module=cli status=error error={message}");
            eprintln!("duelrank: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = match cli.config.as_ref() {
        Some(path) => EngineConfig::load(path).map_err(|err| err.to_string())?,
        None => EngineConfig::default(),
    };
    init_logging_from_config(&config.logging)?;

    let conn = match config.database_path.as_ref() {
        Some(path) => open_db(path),
        None => open_db_in_memory(),
    }
    .map_err(|err| err.to_string())?;

    let repo = SqliteSubmissionRepository::try_new(&conn).map_err(|err| err.to_string())?;
    let board = LeaderboardService::with_limits(repo, config.leaderboard);

    println!("duelrank_core version={}", core_version());

    let per_category = board
        .top_n(&LeaderboardRequest::top_per_category(cli.per_category))
        .map_err(|err| err.to_string())?;
    println!("-- top per category --");
    print_entries(&per_category);

    let overall = board
        .top_n(&LeaderboardRequest::top(cli.limit))
        .map_err(|err| err.to_string())?;
    println!("-- overall --");
    print_entries(&overall);

    Ok(())
}

fn print_entries(entries: &[RankedSubmission]) {
    if entries.is_empty() {
        println!("(no submissions)");
    }
    for entry in entries {
        let submission = &entry.submission;
        println!(
            "category={} rank={} rating={:.1} submission={} qualification={:?}",
            submission.category, entry.rank, submission.rating, submission.id, submission.qualification
        );
    }
}
