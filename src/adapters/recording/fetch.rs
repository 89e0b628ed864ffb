//! Recording adapter for the `ScoreboardSource` port.

use std::sync::{Arc, Mutex};

use super::record_result;
use crate::cassette::recorder::CassetteRecorder;
use crate::cassette::{FETCH_METHOD, FETCH_PORT};
use crate::model::ResourceKey;
use crate::ports::{FetchFuture, ScoreboardSource};

/// Records every fetch while delegating to an inner source.
pub struct RecordingScoreboardSource {
    inner: Arc<dyn ScoreboardSource>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingScoreboardSource {
    /// Wraps `inner`, appending each fetch to `recorder`.
    pub fn new(inner: Arc<dyn ScoreboardSource>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

impl ScoreboardSource for RecordingScoreboardSource {
    fn fetch(&self, key: ResourceKey) -> FetchFuture<'_> {
        Box::pin(async move {
            let result = self.inner.fetch(key).await;
            if let Err(e) = record_result(&self.recorder, FETCH_PORT, FETCH_METHOD, &key, &result) {
                tracing::warn!(leaderboard = %key, error = %e, "failed to record fetch");
            }
            result
        })
    }
}
