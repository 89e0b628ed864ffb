//! `starwatch watch` command.

use std::path::Path;
use std::sync::Arc;

use super::RECORD_ENV;
use crate::cli::ConfigArgs;
use crate::context::ServiceContext;
use crate::scheduler::{Notifier, Termination};
use crate::store::SnapshotStore;

/// Execute the `watch` command.
///
/// Subscribes to one scoreboard and runs until Ctrl-C or until the
/// subscription terminates on its own. When `STARWATCH_RECORD` is set,
/// every fetch is recorded into that directory.
///
/// # Errors
///
/// Returns an error string if configuration is incomplete, the stored
/// snapshot is unreadable or the subscription stops for any reason other
/// than an interrupt.
pub async fn run(
    leaderboard: u64,
    year: Option<i32>,
    interval_secs: Option<u64>,
    args: &ConfigArgs,
) -> Result<(), String> {
    let mut config = args.load().map_err(|e| e.to_string())?;
    if let Some(secs) = interval_secs {
        config.interval_secs = secs;
    }

    let ctx = match std::env::var(RECORD_ENV) {
        Ok(dir) => ServiceContext::recording(&config, Path::new(&dir)),
        Err(_) => ServiceContext::live(&config),
    }
    .map_err(|e| e.to_string())?;

    let store = SnapshotStore::new(Arc::clone(&ctx.fs), &config.state_dir);
    let notifier = Notifier::new(ctx.clone(), store, config.scheduler_config());
    let handle = match year {
        Some(year) => notifier.subscribe(year, leaderboard),
        None => notifier.subscribe_current(leaderboard),
    }
    .map_err(|e| e.to_string())?;

    eprintln!(
        "Watching scoreboard {} every {}s (subscription {}). Press Ctrl-C to stop.",
        handle.key(),
        config.scheduler_config().interval.as_secs(),
        handle.id()
    );

    let ended = tokio::select! {
        interrupted = tokio::signal::ctrl_c() => {
            if let Err(e) = interrupted {
                tracing::warn!(error = %e, "cannot listen for Ctrl-C");
            }
            None
        }
        reason = handle.wait() => Some(reason),
    };
    notifier.shutdown().await;

    if let Some(path) = ctx.finish_recording().map_err(|e| e.to_string())? {
        eprintln!("Recording saved to: {}", path.display());
    }

    match ended {
        None | Some(Termination::Cancelled) => Ok(()),
        Some(reason) => Err(format!("subscription to {} ended: {reason}", handle.key())),
    }
}
