//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{NotifierConfig, ENV_CONFIG_FILE, ENV_STATE_DIR};
use crate::error::ConfigError;

/// Top-level CLI parser for `starwatch`.
#[derive(Debug, Parser)]
#[command(name = "starwatch", version, about = "Watch private scoreboards and post new stars to chat")]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command that reads configuration.
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
    /// Config file; `starwatch.yaml` is used when present.
    #[arg(long, value_name = "FILE", env = ENV_CONFIG_FILE)]
    pub config: Option<PathBuf>,

    /// Directory holding the scoreboard snapshots.
    #[arg(long, value_name = "DIR", env = ENV_STATE_DIR)]
    pub state_dir: Option<PathBuf>,
}

impl ConfigArgs {
    /// Loads the config file, overlays the environment, then these options.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed.
    pub fn load(&self) -> Result<NotifierConfig, ConfigError> {
        let mut config = NotifierConfig::load(self.config.as_deref())?
            .overlay_env(|name| std::env::var(name).ok());
        if let Some(dir) = &self.state_dir {
            config.state_dir.clone_from(dir);
        }
        Ok(config)
    }
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll a scoreboard and post every change until interrupted.
    Watch {
        /// Id of the scoreboard owner.
        #[arg(long, short = 'l')]
        leaderboard: u64,
        /// Event year; defaults to the current event.
        #[arg(long, short = 'y')]
        year: Option<i32>,
        /// Seconds between two fetches.
        #[arg(long)]
        interval_secs: Option<u64>,
        /// Configuration options.
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Print the last stored snapshot of a scoreboard.
    Show {
        /// Id of the scoreboard owner.
        #[arg(long, short = 'l')]
        leaderboard: u64,
        /// Event year; defaults to the current event.
        #[arg(long, short = 'y')]
        year: Option<i32>,
        /// Configuration options.
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Run the notifier against recorded fetches, printing changes to stdout.
    Replay {
        /// Cassette written by a run with `STARWATCH_RECORD` set.
        #[arg(long, value_name = "FILE")]
        cassette: PathBuf,
        /// Configuration options.
        #[command(flatten)]
        config: ConfigArgs,
    },
}
