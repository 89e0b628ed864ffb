//! Port implementations.
//!
//! - `live`: real clock, disk, HTTP fetches and chat webhooks.
//! - `recording`: wraps a live source and captures its results to a cassette.
//! - `replaying`: serves results from a cassette.

pub mod live;
pub mod recording;
pub mod replaying;
