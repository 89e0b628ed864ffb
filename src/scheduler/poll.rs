//! The per-key polling loop.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::handle::{SubscriptionHandle, SubscriptionState, Termination};
use super::Shared;
use crate::change;
use crate::dispatch;
use crate::error::FetchError;
use crate::model::{ResourceKey, Scoreboard};

/// Runs the loop for `handle` until it terminates, then releases the key.
pub(super) async fn run(
    shared: Arc<Shared>,
    handle: SubscriptionHandle,
    seed: Option<Scoreboard>,
    status: watch::Sender<SubscriptionState>,
) {
    let key = handle.key();
    let mut exit = Exit { shared, handle, status, termination: Termination::Aborted };
    exit.termination = poll(&exit.shared, key, seed, exit.handle.token()).await;
}

/// Releases the key and reports the termination when the loop's future is
/// dropped, including when the task panics.
struct Exit {
    shared: Arc<Shared>,
    handle: SubscriptionHandle,
    status: watch::Sender<SubscriptionState>,
    termination: Termination,
}

impl Drop for Exit {
    fn drop(&mut self) {
        // Release before reporting; waiters may resubscribe immediately.
        self.shared.release(&self.handle);
        let key = self.handle.key();
        let subscription = self.handle.id();
        match &self.termination {
            Termination::Cancelled => {
                tracing::info!(leaderboard = %key, subscription, "subscription cancelled");
            }
            reason => {
                tracing::warn!(leaderboard = %key, subscription, %reason, "subscription terminated");
            }
        }
        let termination = std::mem::replace(&mut self.termination, Termination::Aborted);
        self.status.send_replace(SubscriptionState::Terminated(termination));
    }
}

async fn poll(
    shared: &Shared,
    key: ResourceKey,
    seed: Option<Scoreboard>,
    token: &CancellationToken,
) -> Termination {
    let mut last = seed.unwrap_or_else(|| Scoreboard::empty(key));
    let mut ticker = time::interval(shared.config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut failures = 0u32;

    loop {
        tokio::select! {
            biased;
            () = token.cancelled() => return Termination::Cancelled,
            _ = ticker.tick() => {}
        }

        let fetched = tokio::select! {
            biased;
            () = token.cancelled() => {
                tracing::debug!(leaderboard = %key, "abandoning in-flight fetch");
                return Termination::Cancelled;
            }
            fetched = shared.ctx.source.fetch(key) => fetched,
        };

        let current = match fetched {
            Ok(board) => {
                failures = 0;
                board
            }
            Err(e) if e.is_transient() => {
                failures += 1;
                tracing::warn!(leaderboard = %key, error = %e, failures, "fetch failed, waiting for next tick");
                if shared.config.max_consecutive_failures.is_some_and(|max| failures >= max) {
                    return Termination::FetchFailuresExhausted { attempts: failures };
                }
                continue;
            }
            Err(FetchError::Exhausted) => return Termination::SourceExhausted,
            Err(e) => {
                tracing::error!(leaderboard = %key, error = %e, "fetched scoreboard is malformed");
                return Termination::Malformed(e.to_string());
            }
        };

        let change = change::detect(Some(last), current);
        if !change.has_changed() {
            tracing::debug!(leaderboard = %key, "no new stars");
            last = change.into_current();
            continue;
        }

        tracing::info!(
            leaderboard = %key,
            members = change.current().member_count(),
            last_star = ?change.current().last_earned_at(),
            "scoreboard changed"
        );

        // Checkpoint first; a crash before dispatch drops this message.
        if let Err(e) = shared.store.save(change.current()) {
            tracing::error!(leaderboard = %key, error = %e, "failed to checkpoint snapshot");
        }
        dispatch::dispatch(&change, &shared.ctx.channels).await;

        last = change.into_current();
    }
}
