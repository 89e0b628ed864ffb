//! Binary entrypoint for the `starwatch` CLI.

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("starwatch=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Recording is handled in commands::watch via STARWATCH_RECORD=<dir>.
    match starwatch::run(std::env::args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
