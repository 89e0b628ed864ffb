//! Replaying adapter for the `ScoreboardSource` port.

use std::sync::{Mutex, PoisonError};

use super::replay_result;
use crate::cassette::format::Cassette;
use crate::cassette::replayer::CassetteReplayer;
use crate::cassette::{FETCH_METHOD, FETCH_PORT};
use crate::error::FetchError;
use crate::model::{ResourceKey, Scoreboard};
use crate::ports::{FetchFuture, ScoreboardSource};

/// Serves recorded fetches, one per call, then reports exhaustion.
///
/// Recorded failures replay as [`FetchError::Transport`] so the scheduler
/// retries them on the next tick.
pub struct ReplayingScoreboardSource {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingScoreboardSource {
    /// Creates a source over the fetches recorded in `cassette`.
    #[must_use]
    pub fn new(cassette: &Cassette) -> Self {
        Self { replayer: Mutex::new(CassetteReplayer::new(cassette)) }
    }

    /// Key of the first recorded fetch, if any.
    #[must_use]
    pub fn first_key(&self) -> Option<ResourceKey> {
        let replayer = self.replayer.lock().unwrap_or_else(PoisonError::into_inner);
        let input = replayer.peek(FETCH_PORT, FETCH_METHOD)?.input.clone();
        serde_json::from_value(input).ok()
    }

    /// Recorded fetches not yet served.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.replayer.lock().unwrap_or_else(PoisonError::into_inner).remaining(FETCH_PORT, FETCH_METHOD)
    }
}

impl ScoreboardSource for ReplayingScoreboardSource {
    fn fetch(&self, key: ResourceKey) -> FetchFuture<'_> {
        let next = self
            .replayer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_interaction(FETCH_PORT, FETCH_METHOD);

        let result = match next {
            None => Err(FetchError::Exhausted),
            Some(interaction) => {
                tracing::debug!(leaderboard = %key, seq = interaction.seq, "replaying fetch");
                match replay_result::<Scoreboard>(interaction.output) {
                    Ok(Ok(board)) => Ok(board),
                    Ok(Err(text)) => Err(FetchError::Transport(text)),
                    Err(e) => Err(FetchError::Decode(e.0)),
                }
            }
        };
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::format::Interaction;
    use crate::model::Member;
    use chrono::Utc;
    use serde_json::json;

    fn cassette(outputs: Vec<serde_json::Value>) -> Cassette {
        Cassette {
            name: "replay".into(),
            recorded_at: Utc::now(),
            interactions: outputs
                .into_iter()
                .zip(0..)
                .map(|(output, seq)| Interaction {
                    seq,
                    port: FETCH_PORT.into(),
                    method: FETCH_METHOD.into(),
                    input: json!({"year": 2023, "owner_id": 5}),
                    output,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn replays_boards_then_errors_then_exhaustion() {
        let key = ResourceKey::new(2023, 5);
        let mut board = Scoreboard::empty(key);
        board.add_member(Member::new(5).with_scores(3, 0));
        let source = ReplayingScoreboardSource::new(&cassette(vec![
            json!({"Ok": serde_json::to_value(&board).unwrap()}),
            json!({"Err": "connection reset"}),
        ]));
        assert_eq!(source.first_key(), Some(key));
        assert_eq!(source.remaining(), 2);

        assert_eq!(source.fetch(key).await.unwrap(), board);
        let err = source.fetch(key).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(source.fetch(key).await.unwrap_err(), FetchError::Exhausted);
        assert_eq!(source.first_key(), None);
    }

    #[tokio::test]
    async fn unreadable_recording_is_a_decode_error() {
        let source = ReplayingScoreboardSource::new(&cassette(vec![json!({"Ok": {"event": 1}})]));
        let err = source.fetch(ResourceKey::new(2023, 5)).await.unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }
}
