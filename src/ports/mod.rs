//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the polling core and an
//! external collaborator (time, ids, disk, the remote scoreboard, chat
//! sinks, message formatting). Implementations live in `src/adapters/`
//! and `src/render/`.

pub mod clock;
pub mod fetch;
pub mod filesystem;
pub mod id_gen;
pub mod render;
pub mod sink;

pub use clock::Clock;
pub use fetch::{FetchFuture, ScoreboardSource};
pub use filesystem::{FileSystem, FsError};
pub use id_gen::IdGenerator;
pub use render::Renderer;
pub use sink::{DeliveryFuture, Sink};
