//! Scoreboard source port.

use std::future::Future;
use std::pin::Pin;

use crate::error::FetchError;
use crate::model::{ResourceKey, Scoreboard};

/// Boxed future type alias used by [`ScoreboardSource`] to keep the trait dyn-compatible.
pub type FetchFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Scoreboard, FetchError>> + Send + 'a>>;

/// Fetches the current snapshot of a remote scoreboard.
///
/// Credentials and transport details belong to the implementation.
pub trait ScoreboardSource: Send + Sync {
    /// Fetches the scoreboard identified by `key`.
    ///
    /// # Errors
    ///
    /// Returns a transient [`FetchError`] for network and remote failures,
    /// [`FetchError::Malformed`] when the payload violates a model invariant,
    /// and [`FetchError::Exhausted`] when the source has nothing more to give.
    fn fetch(&self, key: ResourceKey) -> FetchFuture<'_>;
}
