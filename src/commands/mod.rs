//! Command dispatch and handlers.

pub mod replay;
pub mod show;
pub mod watch;

use crate::cli::Command;

/// Environment variable naming a directory to record fetches into.
pub const RECORD_ENV: &str = "STARWATCH_RECORD";

/// Dispatch a parsed command to its handler.
///
/// Long-running commands get a multi-threaded tokio runtime of their own.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub fn dispatch(command: &Command) -> Result<(), String> {
    match command {
        Command::Watch { leaderboard, year, interval_secs, config } => {
            runtime()?.block_on(watch::run(*leaderboard, *year, *interval_secs, config))
        }
        Command::Show { leaderboard, year, config } => show::run(*leaderboard, *year, config),
        Command::Replay { cassette, config } => runtime()?.block_on(replay::run(cassette, config)),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime, String> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to start async runtime: {e}"))
}
