//! Notifier configuration: YAML file, then environment, then CLI flags.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::adapters::live::fetch::DEFAULT_API_BASE;
use crate::error::ConfigError;
use crate::scheduler::SchedulerConfig;

/// Config file read when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "starwatch.yaml";

/// Environment variable holding the session cookie.
pub const ENV_SESSION: &str = "AOC_SESSION";
/// Environment variable holding the Slack webhook URL.
pub const ENV_SLACK_WEBHOOK: &str = "STARWATCH_SLACK_WEBHOOK";
/// Environment variable holding the Discord webhook URL.
pub const ENV_DISCORD_WEBHOOK: &str = "STARWATCH_DISCORD_WEBHOOK";
/// Environment variable backing `--state-dir`.
pub const ENV_STATE_DIR: &str = "STARWATCH_STATE_DIR";
/// Environment variable backing `--config`.
pub const ENV_CONFIG_FILE: &str = "STARWATCH_CONFIG";

/// Settings of a notifier process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotifierConfig {
    /// Session cookie for the event site.
    pub session: Option<String>,
    /// Directory holding one snapshot file per scoreboard.
    pub state_dir: PathBuf,
    /// Seconds between two fetches of the same scoreboard.
    pub interval_secs: u64,
    /// Consecutive failed fetches after which a subscription stops.
    pub max_consecutive_failures: Option<u32>,
    /// UTC offset used for displayed times, like `+01:00`.
    pub display_offset: String,
    /// JSON file mapping account names to display aliases.
    pub member_names: Option<PathBuf>,
    /// Slack incoming webhook URL.
    pub slack_webhook: Option<String>,
    /// Discord webhook URL.
    pub discord_webhook: Option<String>,
    /// Base URL of the event site.
    pub api_base: String,
    /// Seconds before a scoreboard request or webhook post is abandoned.
    pub request_timeout_secs: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            session: None,
            state_dir: PathBuf::from("aoc-leaderboards"),
            interval_secs: 600,
            max_consecutive_failures: None,
            display_offset: "+01:00".into(),
            member_names: None,
            slack_webhook: None,
            discord_webhook: None,
            api_base: DEFAULT_API_BASE.into(),
            request_timeout_secs: 30,
        }
    }
}

/// One entry of the member alias file.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemberName {
    user_name: String,
    name: String,
}

impl NotifierConfig {
    /// Loads the config file.
    ///
    /// With an explicit `path` the file must exist. Without one,
    /// [`DEFAULT_CONFIG_FILE`] is read if present and defaults are used
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(path) => (path, true),
            None => (Path::new(DEFAULT_CONFIG_FILE), false),
        };
        if !required && !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_yaml(&text, path)
    }

    /// Parses config from YAML text; `path` is only used in errors.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for invalid YAML or unknown keys.
    pub fn from_yaml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// Overrides secrets with environment variables looked up through `lookup`.
    ///
    /// Empty values are ignored. The state directory and config path are
    /// read from the environment by the CLI.
    #[must_use]
    pub fn overlay_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        if let Some(session) = get(ENV_SESSION) {
            self.session = Some(session);
        }
        if let Some(url) = get(ENV_SLACK_WEBHOOK) {
            self.slack_webhook = Some(url);
        }
        if let Some(url) = get(ENV_DISCORD_WEBHOOK) {
            self.discord_webhook = Some(url);
        }
        self
    }

    /// The session cookie.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if no session is configured.
    pub fn session(&self) -> Result<&str, ConfigError> {
        self.session
            .as_deref()
            .filter(|session| !session.is_empty())
            .ok_or(ConfigError::Missing("session"))
    }

    /// Parsed [`display_offset`](Self::display_offset).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOffset`] unless the value looks like `+HH:MM`.
    pub fn display_offset(&self) -> Result<FixedOffset, ConfigError> {
        self.display_offset
            .trim()
            .parse::<FixedOffset>()
            .map_err(|_| ConfigError::InvalidOffset(self.display_offset.clone()))
    }

    /// Display aliases by account name, read from [`member_names`](Self::member_names).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MemberNames`] if the file is unreadable or not
    /// a JSON list of `{"userName", "name"}` objects.
    pub fn member_aliases(&self) -> Result<HashMap<String, String>, ConfigError> {
        let Some(path) = &self.member_names else {
            return Ok(HashMap::new());
        };
        let failed = |reason: String| ConfigError::MemberNames { path: path.clone(), reason };
        let text = std::fs::read_to_string(path).map_err(|e| failed(e.to_string()))?;
        let names: Vec<MemberName> =
            serde_json::from_str(&text).map_err(|e| failed(e.to_string()))?;
        Ok(names.into_iter().map(|entry| (entry.user_name, entry.name)).collect())
    }

    /// Deadline for a single HTTP request, never zero.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Timing policy for the scheduler.
    #[must_use]
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            interval: Duration::from_secs(self.interval_secs.max(1)),
            max_consecutive_failures: self.max_consecutive_failures,
        }
    }
}
