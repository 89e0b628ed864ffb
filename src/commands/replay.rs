//! `starwatch replay` command.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::replaying::ReplayingScoreboardSource;
use crate::cassette::format::Cassette;
use crate::cli::ConfigArgs;
use crate::context::ServiceContext;
use crate::scheduler::{Notifier, SchedulerConfig, Termination};
use crate::store::SnapshotStore;

/// Time between replayed ticks.
const REPLAY_INTERVAL: Duration = Duration::from_millis(10);

/// Execute the `replay` command.
///
/// Feeds the recorded fetches through a fresh subscription, one per tick,
/// and prints every detected change. Snapshots go to a scratch directory
/// unless `--state-dir` is given.
///
/// # Errors
///
/// Returns an error string if the cassette cannot be loaded or holds a
/// scoreboard that cannot be processed.
pub async fn run(cassette: &Path, args: &ConfigArgs) -> Result<(), String> {
    let config = args.load().map_err(|e| e.to_string())?;
    let cassette = Cassette::load(cassette).map_err(|e| e.to_string())?;
    let source = Arc::new(ReplayingScoreboardSource::new(&cassette));
    let key = source.first_key().ok_or("cassette holds no recorded fetches")?;
    tracing::info!(leaderboard = %key, fetches = source.remaining(), "replaying cassette");

    let ctx = ServiceContext::replaying(&config, source).map_err(|e| e.to_string())?;
    let scratch = args.state_dir.is_none().then(|| {
        std::env::temp_dir().join(format!("starwatch-replay-{}", ctx.id_gen.generate_id()))
    });
    let state_dir = scratch.as_deref().unwrap_or(&config.state_dir);
    let store = SnapshotStore::new(Arc::clone(&ctx.fs), state_dir);
    let notifier = Notifier::new(
        ctx,
        store,
        SchedulerConfig { interval: REPLAY_INTERVAL, max_consecutive_failures: None },
    );

    let handle = notifier.subscribe(key.year, key.owner_id).map_err(|e| e.to_string())?;
    let ended = handle.wait().await;

    if let Some(dir) = scratch {
        let _ = std::fs::remove_dir_all(dir);
    }
    match ended {
        Termination::SourceExhausted | Termination::Cancelled => Ok(()),
        reason => Err(format!("replay of {key} stopped: {reason}")),
    }
}
