//! Scoreboard domain model.
//!
//! A [`Scoreboard`] is one snapshot of a tracked resource. Members carry
//! their per-day [`DayTask`] completions; everything else (last star,
//! ranking) is derived on demand.

pub mod day_task;
pub mod member;
pub mod scoreboard;

pub use day_task::{DayTask, FIRST_DAY, LAST_DAY, LEVELS_PER_DAY};
pub use member::Member;
pub use scoreboard::{
    current_event_year, Rank, ResourceKey, Scoreboard, DAY_UNLOCK_HOUR, FIRST_EVENT_YEAR,
};
