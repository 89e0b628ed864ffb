//! Live adapters for the `Sink` port: chat webhooks and stdout.

use std::io::Write;

use reqwest::Client;
use serde::Serialize;

use crate::error::SinkError;
use crate::ports::{DeliveryFuture, Sink};

/// Body of a Slack incoming-webhook message.
#[derive(Serialize)]
struct SlackMessage<'a> {
    text: &'a str,
}

/// Body of a Discord webhook message.
#[derive(Serialize)]
struct DiscordMessage<'a> {
    content: &'a str,
}

/// Posts messages to a Slack incoming webhook.
pub struct SlackWebhookSink {
    client: Client,
    url: String,
}

impl SlackWebhookSink {
    /// Creates a sink posting to `url`.
    #[must_use]
    pub fn new(client: Client, url: &str) -> Self {
        Self { client, url: url.to_string() }
    }
}

impl Sink for SlackWebhookSink {
    fn name(&self) -> &str {
        "slack"
    }

    fn deliver<'a>(&'a self, text: &'a str) -> DeliveryFuture<'a> {
        Box::pin(post_json(&self.client, &self.url, SlackMessage { text }))
    }
}

/// Posts messages to a Discord webhook.
pub struct DiscordWebhookSink {
    client: Client,
    url: String,
}

impl DiscordWebhookSink {
    /// Creates a sink posting to `url`.
    #[must_use]
    pub fn new(client: Client, url: &str) -> Self {
        Self { client, url: url.to_string() }
    }
}

impl Sink for DiscordWebhookSink {
    fn name(&self) -> &str {
        "discord"
    }

    fn deliver<'a>(&'a self, text: &'a str) -> DeliveryFuture<'a> {
        Box::pin(post_json(&self.client, &self.url, DiscordMessage { content: text }))
    }
}

async fn post_json<T: Serialize + Send>(
    client: &Client,
    url: &str,
    body: T,
) -> Result<(), SinkError> {
    let response = client
        .post(url)
        .json(&body)
        .send()
        .await
        .map_err(|e| SinkError::Transport(e.to_string()))?;
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(SinkError::Rejected { status: status.as_u16() })
    }
}

/// Writes messages to standard output, separated by a blank line.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl Sink for StdoutSink {
    fn name(&self) -> &str {
        "stdout"
    }

    fn deliver<'a>(&'a self, text: &'a str) -> DeliveryFuture<'a> {
        let mut out = std::io::stdout().lock();
        let written = writeln!(out, "{text}\n").and_then(|()| out.flush());
        Box::pin(async move { written.map_err(SinkError::from) })
    }
}
