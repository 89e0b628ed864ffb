//! Cancellable handles to running subscriptions.

use std::fmt;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::model::ResourceKey;

/// Why a polling loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The subscription was cancelled through a handle or by shutdown.
    Cancelled,
    /// Too many fetches failed in a row.
    FetchFailuresExhausted {
        /// Consecutive failures observed.
        attempts: u32,
    },
    /// The source produced a scoreboard that violates a model invariant.
    Malformed(String),
    /// The source has no further scoreboards.
    SourceExhausted,
    /// The polling task ended without reporting a reason.
    Aborted,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("cancelled"),
            Self::FetchFailuresExhausted { attempts } => {
                write!(f, "gave up after {attempts} failed fetches")
            }
            Self::Malformed(reason) => write!(f, "malformed scoreboard: {reason}"),
            Self::SourceExhausted => f.write_str("no more scoreboards to fetch"),
            Self::Aborted => f.write_str("polling task aborted"),
        }
    }
}

/// Lifecycle state of a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionState {
    /// The polling loop is running.
    Active,
    /// The polling loop has stopped and released its registry entry.
    Terminated(Termination),
}

/// Handle to the polling loop of one resource key.
///
/// Cloning is cheap; every clone controls the same loop.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    key: ResourceKey,
    id: String,
    token: CancellationToken,
    state: watch::Receiver<SubscriptionState>,
}

impl SubscriptionHandle {
    pub(super) fn new(
        key: ResourceKey,
        id: String,
    ) -> (Self, watch::Sender<SubscriptionState>) {
        let (tx, rx) = watch::channel(SubscriptionState::Active);
        (Self { key, id, token: CancellationToken::new(), state: rx }, tx)
    }

    /// Key of the tracked scoreboard.
    #[must_use]
    pub fn key(&self) -> ResourceKey {
        self.key
    }

    /// Unique id of this subscription.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Stops the polling loop.
    ///
    /// No tick starts after the loop observes the cancellation; a fetch in
    /// flight is abandoned, a dispatch in flight is allowed to finish.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether [`cancel`](Self::cancel) was called on any clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SubscriptionState {
        self.state.borrow().clone()
    }

    /// Waits until the polling loop has stopped.
    pub async fn wait(&self) -> Termination {
        let mut state = self.state.clone();
        let result = state
            .wait_for(|s| matches!(s, SubscriptionState::Terminated(_)))
            .await
            .map(|s| (*s).clone());
        match result {
            Ok(SubscriptionState::Terminated(reason)) => reason,
            Ok(SubscriptionState::Active) | Err(_) => Termination::Aborted,
        }
    }

    pub(super) fn token(&self) -> &CancellationToken {
        &self.token
    }
}
