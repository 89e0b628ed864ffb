//! Fan-out of a detected change to the configured notification channels.

use std::sync::Arc;

use tokio::task::JoinSet;

use crate::change::Change;
use crate::ports::{Renderer, Sink};

/// A sink together with the renderer that formats messages for it.
#[derive(Clone)]
pub struct Channel {
    /// Formats the change for this sink.
    pub renderer: Arc<dyn Renderer>,
    /// Receives the rendered text.
    pub sink: Arc<dyn Sink>,
}

impl Channel {
    /// Pairs a renderer with a sink.
    #[must_use]
    pub fn new(renderer: Arc<dyn Renderer>, sink: Arc<dyn Sink>) -> Self {
        Self { renderer, sink }
    }
}

/// Outcome counts of one dispatch call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Channels that accepted the message.
    pub delivered: usize,
    /// Channels that failed or panicked.
    pub failed: usize,
}

/// Delivers `change` to every channel.
///
/// Deliveries run concurrently. A failing or panicking sink is logged and
/// does not affect the others.
pub async fn dispatch(change: &Change, channels: &[Channel]) -> DispatchSummary {
    let mut summary = DispatchSummary::default();
    let mut deliveries = JoinSet::new();

    for channel in channels {
        let text = channel.renderer.render(change);
        let sink = Arc::clone(&channel.sink);
        deliveries.spawn(async move {
            let outcome = sink.deliver(&text).await;
            (sink.name().to_string(), outcome)
        });
    }

    while let Some(joined) = deliveries.join_next().await {
        match joined {
            Ok((sink, Ok(()))) => {
                tracing::debug!(sink = %sink, leaderboard = %change.current().key(), "delivered");
                summary.delivered += 1;
            }
            Ok((sink, Err(e))) => {
                tracing::warn!(sink = %sink, leaderboard = %change.current().key(), error = %e, "delivery failed");
                summary.failed += 1;
            }
            Err(e) => {
                tracing::error!(leaderboard = %change.current().key(), error = %e, "sink task aborted");
                summary.failed += 1;
            }
        }
    }

    summary
}
