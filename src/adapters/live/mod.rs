//! Live adapters for real external interactions.

pub mod clock;
pub mod fetch;
pub mod filesystem;
pub mod id_gen;
pub mod sink;

pub use clock::LiveClock;
pub use fetch::HttpScoreboardSource;
pub use filesystem::LiveFileSystem;
pub use id_gen::LiveIdGenerator;
pub use sink::{DiscordWebhookSink, SlackWebhookSink, StdoutSink};
