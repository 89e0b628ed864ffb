//! Per-day completion state.

use std::cmp::Ordering;

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::ModelError;

/// Number of levels each day's puzzle has.
pub const LEVELS_PER_DAY: usize = 2;

/// First day of the event.
pub const FIRST_DAY: u8 = 1;

/// Last day of the event.
pub const LAST_DAY: u8 = 25;

/// Completion state of one day's puzzle for one member.
///
/// Levels are stored in the order they were completed. The sequence only
/// grows, never holds more than [`LEVELS_PER_DAY`] entries and never goes
/// back in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayTask {
    day: u8,
    levels: Vec<DateTime<Utc>>,
}

impl DayTask {
    /// Creates a task with no completed levels.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DayOutOfRange`] if `day` is not in `1..=25`.
    pub fn new(day: i64) -> Result<Self, ModelError> {
        let day = u8::try_from(day)
            .ok()
            .filter(|d| (FIRST_DAY..=LAST_DAY).contains(d))
            .ok_or(ModelError::DayOutOfRange(day))?;
        Ok(Self { day, levels: Vec::with_capacity(LEVELS_PER_DAY) })
    }

    /// Creates a task from its completion instants in level order.
    ///
    /// # Errors
    ///
    /// Fails on an invalid day, more than two instants, or instants that
    /// are not monotonically non-decreasing.
    pub fn with_levels(
        day: i64,
        levels: impl IntoIterator<Item = DateTime<Utc>>,
    ) -> Result<Self, ModelError> {
        let mut task = Self::new(day)?;
        for completed_at in levels {
            task.complete_next_level(completed_at)?;
        }
        Ok(task)
    }

    /// Appends the completion instant of the next level.
    ///
    /// Returns the number of completed levels after the append.
    ///
    /// # Errors
    ///
    /// Fails if all levels are already complete or `completed_at` lies
    /// before the previous level's completion.
    pub fn complete_next_level(&mut self, completed_at: DateTime<Utc>) -> Result<usize, ModelError> {
        if self.levels.len() >= LEVELS_PER_DAY {
            return Err(ModelError::TooManyLevels { day: self.day, levels: self.levels.len() });
        }
        if self.levels.last().is_some_and(|previous| completed_at < *previous) {
            return Err(ModelError::NonMonotonicCompletion {
                day: self.day,
                level: self.levels.len() + 1,
            });
        }
        self.levels.push(completed_at);
        Ok(self.levels.len())
    }

    /// The day this task belongs to.
    #[must_use]
    pub fn day(&self) -> u8 {
        self.day
    }

    /// Completion instants in level order.
    #[must_use]
    pub fn levels(&self) -> &[DateTime<Utc>] {
        &self.levels
    }

    /// Number of completed levels (0, 1 or 2).
    #[must_use]
    pub fn completed_levels(&self) -> usize {
        self.levels.len()
    }

    /// Whether every level of the day is complete.
    #[must_use]
    pub fn has_completed_all_levels(&self) -> bool {
        self.levels.len() == LEVELS_PER_DAY
    }

    /// Completion instant of a 1-based level, if reached.
    #[must_use]
    pub fn completion_for_level(&self, level: usize) -> Option<DateTime<Utc>> {
        level.checked_sub(1).and_then(|idx| self.levels.get(idx)).copied()
    }

    /// Instant of the most recent completion; `None` when nothing is complete.
    #[must_use]
    pub fn last_completion(&self) -> Option<DateTime<Utc>> {
        self.levels.last().copied()
    }

    /// Time taken from the first to the second level.
    #[must_use]
    pub fn duration_between_levels(&self) -> Option<TimeDelta> {
        match self.levels.as_slice() {
            [first, second] => Some(*second - *first),
            _ => None,
        }
    }

    /// Presentation order: by day, then levels completed, then last completion.
    #[must_use]
    pub fn presentation_cmp(&self, other: &Self) -> Ordering {
        self.day
            .cmp(&other.day)
            .then_with(|| self.completed_levels().cmp(&other.completed_levels()))
            .then_with(|| self.last_completion().cmp(&other.last_completion()))
    }
}
