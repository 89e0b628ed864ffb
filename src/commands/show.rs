//! `starwatch show` command.

use std::sync::Arc;

use crate::adapters::live::{LiveClock, LiveFileSystem};
use crate::cli::ConfigArgs;
use crate::model::{current_event_year, ResourceKey};
use crate::ports::Clock;
use crate::render::{BoardRenderer, Style};
use crate::store::SnapshotStore;

/// Execute the `show` command.
///
/// Prints the stored snapshot as a plain-text board, or a note when
/// nothing was stored yet.
///
/// # Errors
///
/// Returns an error string if configuration or the stored snapshot cannot
/// be read.
pub fn run(leaderboard: u64, year: Option<i32>, args: &ConfigArgs) -> Result<(), String> {
    let config = args.load().map_err(|e| e.to_string())?;
    let clock: Arc<dyn Clock> = Arc::new(LiveClock);
    let key = ResourceKey::new(year.unwrap_or_else(|| current_event_year(clock.now())), leaderboard);

    let store = SnapshotStore::new(Arc::new(LiveFileSystem), &config.state_dir);
    match store.load(key).map_err(|e| e.to_string())? {
        Some(board) => {
            let offset = config.display_offset().map_err(|e| e.to_string())?;
            let renderer = BoardRenderer::new(Style::Plain, clock, offset);
            println!("{}", renderer.render_board(&board));
        }
        None => {
            println!("No snapshot stored for scoreboard {key} in {}.", store.root().display());
        }
    }
    Ok(())
}
