//! Cassettes: recorded scoreboard fetches that can be replayed later.
//!
//! A cassette is a YAML file listing interactions in the order they
//! happened. Results use the `{"Ok": value}` / `{"Err": "message"}`
//! convention so that failures replay as failures.

pub mod format;
pub mod recorder;
pub mod replayer;

/// Port name under which scoreboard fetches are recorded.
pub const FETCH_PORT: &str = "fetch";
/// Method name under which scoreboard fetches are recorded.
pub const FETCH_METHOD: &str = "scoreboard";
/// File name of the fetch cassette inside a recording directory.
pub const FETCH_CASSETTE_FILE: &str = "fetch.cassette.yaml";
