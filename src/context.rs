//! Service context bundling all port trait objects.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use reqwest::Client;

use crate::adapters::live::{
    DiscordWebhookSink, HttpScoreboardSource, LiveClock, LiveFileSystem, LiveIdGenerator,
    SlackWebhookSink, StdoutSink,
};
use crate::adapters::recording::RecordingScoreboardSource;
use crate::adapters::replaying::ReplayingScoreboardSource;
use crate::cassette::recorder::CassetteRecorder;
use crate::cassette::FETCH_CASSETTE_FILE;
use crate::config::NotifierConfig;
use crate::dispatch::Channel;
use crate::error::{CassetteError, ConfigError};
use crate::ports::{Clock, FileSystem, IdGenerator, ScoreboardSource};
use crate::render::{BoardRenderer, Style};

/// Bundles all port trait objects into a single context.
///
/// Each field provides access to one external boundary. Constructors
/// wire up different adapter implementations (live, recording, replaying).
/// Cloning shares the adapters.
#[derive(Clone)]
pub struct ServiceContext {
    /// Clock for obtaining the current time.
    pub clock: Arc<dyn Clock>,
    /// Filesystem for snapshot I/O.
    pub fs: Arc<dyn FileSystem>,
    /// ID generator for subscription ids.
    pub id_gen: Arc<dyn IdGenerator>,
    /// Where scoreboards come from.
    pub source: Arc<dyn ScoreboardSource>,
    /// Where rendered changes go.
    pub channels: Vec<Channel>,
    recorder: Option<Arc<Mutex<CassetteRecorder>>>,
}

impl ServiceContext {
    /// Assembles a context from individual adapters.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        fs: Arc<dyn FileSystem>,
        id_gen: Arc<dyn IdGenerator>,
        source: Arc<dyn ScoreboardSource>,
        channels: Vec<Channel>,
    ) -> Self {
        Self { clock, fs, id_gen, source, channels, recorder: None }
    }

    /// Creates a live context fetching over HTTPS.
    ///
    /// Changes go to the configured webhooks, or to stdout if none is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is missing, the display offset is
    /// invalid, the member alias file cannot be loaded or the HTTP client
    /// cannot be built.
    pub fn live(config: &NotifierConfig) -> Result<Self, ConfigError> {
        let client = http_client(config)?;
        let source = HttpScoreboardSource::new(client.clone(), &config.api_base, config.session()?)
            .with_aliases(config.member_aliases()?);
        let clock: Arc<dyn Clock> = Arc::new(LiveClock);
        let channels = channels(config, &client, &clock)?;

        Ok(Self {
            clock,
            fs: Arc::new(LiveFileSystem),
            id_gen: Arc::new(LiveIdGenerator),
            source: Arc::new(source),
            channels,
            recorder: None,
        })
    }

    /// Creates a live context that also records every fetch.
    ///
    /// The cassette goes to `<dir>/fetch.cassette.yaml` when
    /// [`finish_recording`](Self::finish_recording) is called.
    ///
    /// # Errors
    ///
    /// See [`live`](Self::live).
    pub fn recording(config: &NotifierConfig, dir: &Path) -> Result<Self, ConfigError> {
        let mut ctx = Self::live(config)?;
        let recorder =
            Arc::new(Mutex::new(CassetteRecorder::new(dir.join(FETCH_CASSETTE_FILE), "starwatch")));
        ctx.source = Arc::new(RecordingScoreboardSource::new(ctx.source, Arc::clone(&recorder)));
        ctx.recorder = Some(recorder);
        tracing::info!(dir = %dir.display(), "recording fetches");
        Ok(ctx)
    }

    /// Creates a context that replays recorded fetches and prints to stdout.
    ///
    /// # Errors
    ///
    /// Returns an error if the display offset is invalid.
    pub fn replaying(
        config: &NotifierConfig,
        source: Arc<ReplayingScoreboardSource>,
    ) -> Result<Self, ConfigError> {
        let clock: Arc<dyn Clock> = Arc::new(LiveClock);
        let renderer = BoardRenderer::new(Style::Plain, Arc::clone(&clock), config.display_offset()?);
        Ok(Self {
            clock,
            fs: Arc::new(LiveFileSystem),
            id_gen: Arc::new(LiveIdGenerator),
            source,
            channels: vec![Channel::new(Arc::new(renderer), Arc::new(StdoutSink))],
            recorder: None,
        })
    }

    /// Writes the recorded cassette, if this context records.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette file cannot be written.
    pub fn finish_recording(&self) -> Result<Option<PathBuf>, CassetteError> {
        let Some(recorder) = &self.recorder else {
            return Ok(None);
        };
        let recorder = recorder.lock().unwrap_or_else(PoisonError::into_inner);
        tracing::info!(fetches = recorder.len(), path = %recorder.path().display(), "writing cassette");
        Ok(Some(recorder.finish()?))
    }
}

/// Client shared by the scoreboard source and the webhook sinks.
///
/// Every request has a deadline; a silent server surfaces as a transport
/// error.
pub(crate) fn http_client(config: &NotifierConfig) -> Result<Client, ConfigError> {
    Ok(Client::builder()
        .timeout(config.request_timeout())
        .user_agent(concat!("starwatch/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

fn channels(
    config: &NotifierConfig,
    client: &Client,
    clock: &Arc<dyn Clock>,
) -> Result<Vec<Channel>, ConfigError> {
    let offset = config.display_offset()?;
    let renderer = |style| Arc::new(BoardRenderer::new(style, Arc::clone(clock), offset));

    let mut channels = Vec::new();
    if let Some(url) = &config.slack_webhook {
        channels.push(Channel::new(
            renderer(Style::Slack),
            Arc::new(SlackWebhookSink::new(client.clone(), url)),
        ));
    }
    if let Some(url) = &config.discord_webhook {
        channels.push(Channel::new(
            renderer(Style::Discord),
            Arc::new(DiscordWebhookSink::new(client.clone(), url)),
        ));
    }
    if channels.is_empty() {
        tracing::info!("no webhook configured, printing changes to stdout");
        channels.push(Channel::new(renderer(Style::Plain), Arc::new(StdoutSink)));
    }
    Ok(channels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> NotifierConfig {
        NotifierConfig { session: Some("cookie".into()), ..NotifierConfig::default() }
    }

    #[test]
    fn live_context_requires_a_session() {
        let err = ServiceContext::live(&NotifierConfig::default()).err().unwrap();
        assert!(matches!(err, ConfigError::Missing("session")));
    }

    #[test]
    fn live_context_falls_back_to_stdout() {
        let ctx = ServiceContext::live(&config()).unwrap();
        let names: Vec<&str> = ctx.channels.iter().map(|c| c.sink.name()).collect();
        assert_eq!(names, vec!["stdout"]);
        assert_eq!(ctx.finish_recording().unwrap(), None);
    }

    #[test]
    fn every_configured_webhook_gets_a_channel() {
        let config = NotifierConfig {
            slack_webhook: Some("https://hooks.slack.invalid/x".into()),
            discord_webhook: Some("https://discord.invalid/api/webhooks/y".into()),
            ..config()
        };
        let ctx = ServiceContext::live(&config).unwrap();
        let names: Vec<&str> = ctx.channels.iter().map(|c| c.sink.name()).collect();
        assert_eq!(names, vec!["slack", "discord"]);
    }

    #[tokio::test]
    async fn silent_webhook_times_out_as_transport_error() {
        use crate::error::SinkError;
        use crate::ports::{ScoreboardSource, Sink};
        use crate::model::ResourceKey;
        use std::time::Duration;

        // Accepts connections through the backlog but never answers.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let config = NotifierConfig { request_timeout_secs: 1, ..config() };
        let client = http_client(&config).unwrap();

        let sink = SlackWebhookSink::new(client.clone(), &format!("{base}/hook"));
        let delivered = tokio::time::timeout(Duration::from_secs(10), sink.deliver("hi")).await;
        assert!(matches!(delivered, Ok(Err(SinkError::Transport(_)))), "{delivered:?}");

        let source = HttpScoreboardSource::new(client, &base, "cookie");
        let fetched =
            tokio::time::timeout(Duration::from_secs(10), source.fetch(ResourceKey::new(2023, 1)))
                .await
                .unwrap();
        assert!(fetched.unwrap_err().is_transient());

        drop(listener);
    }

    #[test]
    fn recording_context_writes_an_empty_cassette() {
        let dir = std::env::temp_dir().join(format!("starwatch_ctx_rec_{}", std::process::id()));
        let ctx = ServiceContext::recording(&config(), &dir).unwrap();

        let path = ctx.finish_recording().unwrap().unwrap();
        assert_eq!(path, dir.join(FETCH_CASSETTE_FILE));
        let cassette = crate::cassette::format::Cassette::load(&path).unwrap();
        assert!(cassette.interactions.is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
