//! Error types shared across the core and the adapters.

use std::path::PathBuf;

use thiserror::Error;

/// A scoreboard value violated one of its structural invariants.
///
/// These are never clamped or repaired; they point at a data-shape problem
/// upstream and terminate whatever produced them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Day number outside `1..=25`.
    #[error("day {0} is outside the event range 1..=25")]
    DayOutOfRange(i64),

    /// A day task received more completion instants than it has levels.
    #[error("day {day} already has {levels} completed levels")]
    TooManyLevels {
        /// The offending day.
        day: u8,
        /// Levels present before the rejected append.
        levels: usize,
    },

    /// A completion instant lies before the previous level's completion.
    #[error("day {day} level {level} completes before the level preceding it")]
    NonMonotonicCompletion {
        /// The offending day.
        day: u8,
        /// The 1-based level that was out of order.
        level: usize,
    },

    /// A member was stored under a key that is not its own id.
    #[error("member {member} is stored under key {key}")]
    MemberKeyMismatch {
        /// The map key.
        key: u64,
        /// The member's own id.
        member: u64,
    },

    /// A completion timestamp could not be represented.
    #[error("timestamp {0} is out of range")]
    TimestampOutOfRange(i64),
}

/// Failure to obtain a scoreboard from the remote source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Network, DNS, TLS or timeout failure.
    #[error("scoreboard request failed: {0}")]
    Transport(String),

    /// The remote answered with a non-success status.
    #[error("scoreboard request returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// The response body was not the expected JSON document.
    #[error("failed to decode scoreboard: {0}")]
    Decode(String),

    /// The document decoded but describes an impossible scoreboard.
    #[error("scoreboard violates an invariant: {0}")]
    Malformed(#[from] ModelError),

    /// The source has no further scoreboards to hand out.
    #[error("scoreboard source is exhausted")]
    Exhausted,
}

impl FetchError {
    /// Returns `true` for failures that are expected to clear up on a later tick.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Status { .. } | Self::Decode(_))
    }
}

/// Failure to read or write a persisted snapshot.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying filesystem call failed.
    #[error("snapshot i/o failed for {path}: {message}")]
    Io {
        /// File that was being accessed.
        path: PathBuf,
        /// Error reported by the filesystem port.
        message: String,
    },

    /// A snapshot exists but cannot be turned back into a scoreboard.
    #[error("snapshot at {path} is corrupt: {reason}")]
    Corrupt {
        /// File that failed to load.
        path: PathBuf,
        /// Parse or invariant failure.
        reason: String,
    },

    /// The scoreboard could not be encoded.
    #[error("failed to encode snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failure to hand a rendered message to a notification sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The request never reached the sink.
    #[error("delivery failed: {0}")]
    Transport(String),

    /// The sink answered with a non-success status.
    #[error("sink rejected message with status {status}")]
    Rejected {
        /// HTTP status code.
        status: u16,
    },

    /// Writing to a local stream failed.
    #[error("failed to write message: {0}")]
    Io(#[from] std::io::Error),
}

/// A subscription could not be started.
#[derive(Debug, Error)]
pub enum SubscribeError {
    /// The persisted snapshot for the key is unreadable.
    #[error("cannot resume subscription: {0}")]
    CorruptState(#[from] StoreError),
    /// The year predates the first event.
    #[error("no event was held in {0}")]
    InvalidYear(i32),
}

/// Configuration could not be assembled.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but cannot be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid YAML for this schema.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        source: serde_yaml::Error,
    },

    /// The member alias file is unreadable or malformed.
    #[error("failed to load member names from {path}: {reason}")]
    MemberNames {
        /// Alias file path.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// A required value was provided by neither file, environment nor flags.
    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    /// The display offset is not of the form `+HH:MM`.
    #[error("invalid display offset `{0}`")]
    InvalidOffset(String),

    /// The HTTP client could not be set up.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// A cassette file could not be read or written.
#[derive(Debug, Error)]
pub enum CassetteError {
    /// Reading or writing the cassette file failed.
    #[error("cassette {path}: {source}")]
    Io {
        /// Cassette file path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The cassette is not valid YAML for this schema.
    #[error("cassette {path} is malformed: {source}")]
    Format {
        /// Cassette file path.
        path: PathBuf,
        /// Underlying error.
        source: serde_yaml::Error,
    },
}
