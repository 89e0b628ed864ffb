//! Scoreboard participants.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::day_task::DayTask;

/// One participant of a scoreboard.
///
/// Built once from parsed input through the `with_*` methods and read-only
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    id: u64,
    name: Option<String>,
    alias: Option<String>,
    local_score: i64,
    global_score: i64,
    stars: u32,
    tasks: BTreeMap<u8, DayTask>,
}

impl Member {
    /// Creates a member with no name, no score and no completed tasks.
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self {
            id,
            name: None,
            alias: None,
            local_score: 0,
            global_score: 0,
            stars: 0,
            tasks: BTreeMap::new(),
        }
    }

    /// Sets the raw account name.
    #[must_use]
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name.filter(|n| !n.is_empty());
        self
    }

    /// Sets the display alias resolved from the member-name lookup.
    #[must_use]
    pub fn with_alias(mut self, alias: Option<String>) -> Self {
        self.alias = alias.filter(|a| !a.is_empty());
        self
    }

    /// Sets local and global score.
    #[must_use]
    pub fn with_scores(mut self, local_score: i64, global_score: i64) -> Self {
        self.local_score = local_score;
        self.global_score = global_score;
        self
    }

    /// Sets the star count reported by the remote.
    #[must_use]
    pub fn with_stars(mut self, stars: u32) -> Self {
        self.stars = stars;
        self
    }

    /// Adds a day task, replacing any task already recorded for that day.
    #[must_use]
    pub fn with_task(mut self, task: DayTask) -> Self {
        self.tasks.insert(task.day(), task);
        self
    }

    /// Immutable member id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Raw account name, if the account has one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Alias resolved from the member-name lookup.
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Name to show: alias, then account name, then `(user #<id>)`.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.alias
            .as_deref()
            .or(self.name.as_deref())
            .map_or_else(|| format!("(user #{})", self.id), str::to_string)
    }

    /// Score within this scoreboard.
    #[must_use]
    pub fn local_score(&self) -> i64 {
        self.local_score
    }

    /// Score on the global leaderboard.
    #[must_use]
    pub fn global_score(&self) -> i64 {
        self.global_score
    }

    /// Star count as reported by the remote.
    #[must_use]
    pub fn stars(&self) -> u32 {
        self.stars
    }

    /// Instant of the member's most recent star; `None` means never.
    #[must_use]
    pub fn last_star_at(&self) -> Option<DateTime<Utc>> {
        self.tasks.values().filter_map(DayTask::last_completion).max()
    }

    /// Day tasks in day order.
    pub fn tasks(&self) -> impl Iterator<Item = &DayTask> + '_ {
        self.tasks.values()
    }

    /// Task recorded for `day`, if any level of it was completed.
    #[must_use]
    pub fn task_for(&self, day: u8) -> Option<&DayTask> {
        self.tasks.get(&day)
    }

    /// The task whose latest level was completed most recently.
    #[must_use]
    pub fn last_finished_task(&self) -> Option<&DayTask> {
        self.tasks
            .values()
            .filter(|task| task.last_completion().is_some())
            .max_by_key(|task| task.last_completion())
    }
}
