//! Scoreboard snapshots and ranking.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::day_task::DayTask;
use super::member::Member;
use crate::error::ModelError;

/// Local hour of day at which each day's puzzle unlocks.
pub const DAY_UNLOCK_HOUR: u32 = 6;

/// Identifies one trackable scoreboard: event year plus owner id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    /// Event year.
    pub year: i32,
    /// Id of the scoreboard's owner.
    pub owner_id: u64,
}

impl ResourceKey {
    /// Creates a key.
    #[must_use]
    pub fn new(year: i32, owner_id: u64) -> Self {
        Self { year, owner_id }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.year, self.owner_id)
    }
}

/// Position of a member in a scoreboard's ranking.
///
/// `Unranked` sorts after every real rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Rank {
    /// 0-based position in the ranking.
    Ranked(usize),
    /// The member is not on the scoreboard.
    Unranked,
}

/// Snapshot of every member's progress on one scoreboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scoreboard {
    key: ResourceKey,
    members: BTreeMap<u64, Member>,
}

impl Scoreboard {
    /// Creates a scoreboard with no members.
    #[must_use]
    pub fn empty(key: ResourceKey) -> Self {
        Self { key, members: BTreeMap::new() }
    }

    /// Adds a member, returning the member it replaced, if any.
    pub fn add_member(&mut self, member: Member) -> Option<Member> {
        self.members.insert(member.id(), member)
    }

    /// Key of this scoreboard.
    #[must_use]
    pub fn key(&self) -> ResourceKey {
        self.key
    }

    /// Event year.
    #[must_use]
    pub fn event_year(&self) -> i32 {
        self.key.year
    }

    /// Owner id.
    #[must_use]
    pub fn owner_id(&self) -> u64 {
        self.key.owner_id
    }

    /// Looks up a member by id.
    #[must_use]
    pub fn member(&self, id: u64) -> Option<&Member> {
        self.members.get(&id)
    }

    /// Number of members.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Whether the scoreboard has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in id order.
    pub fn members(&self) -> impl Iterator<Item = &Member> + '_ {
        self.members.values()
    }

    /// Latest star earned by anyone; `None` when no star was ever earned.
    #[must_use]
    pub fn last_earned_at(&self) -> Option<DateTime<Utc>> {
        self.members.values().filter_map(Member::last_star_at).max()
    }

    /// Members in rank order.
    ///
    /// Higher local score first, then the earlier last star, then display
    /// name, then id so that the order is total.
    #[must_use]
    pub fn ranked(&self) -> Vec<&Member> {
        let mut ranked: Vec<&Member> = self.members.values().collect();
        ranked.sort_by(|a, b| ranking_cmp(a, b));
        ranked
    }

    /// Rank of the member with `id` in this scoreboard.
    #[must_use]
    pub fn rank_of(&self, id: u64) -> Rank {
        self.ranked()
            .iter()
            .position(|member| member.id() == id)
            .map_or(Rank::Unranked, Rank::Ranked)
    }

    /// Local unlock time of `day` in this scoreboard's event year.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DayOutOfRange`] for days outside `1..=25`.
    pub fn unlock_time(&self, day: u8) -> Result<NaiveDateTime, ModelError> {
        let day = DayTask::new(i64::from(day))?.day();
        NaiveDate::from_ymd_opt(self.key.year, 12, u32::from(day))
            .and_then(|date| date.and_hms_opt(DAY_UNLOCK_HOUR, 0, 0))
            .ok_or(ModelError::DayOutOfRange(i64::from(day)))
    }
}

fn ranking_cmp(a: &Member, b: &Member) -> Ordering {
    b.local_score()
        .cmp(&a.local_score())
        .then_with(|| a.last_star_at().cmp(&b.last_star_at()))
        .then_with(|| a.display_name().cmp(&b.display_name()))
        .then_with(|| a.id().cmp(&b.id()))
}

/// Year of the first event; no scoreboard exists before it.
pub const FIRST_EVENT_YEAR: i32 = 2015;

/// The event year that is current at `now`.
///
/// The event runs in December; before December 1 the previous year's
/// event is still the current one.
#[must_use]
pub fn current_event_year(now: DateTime<Utc>) -> i32 {
    let year = now.year();
    let start = NaiveDate::from_ymd_opt(year, 12, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|start| start.and_utc());
    match start {
        Some(start) if now < start => year - 1,
        _ => year,
    }
}

// --- Persisted layout ---

/// On-disk shape of a scoreboard.
#[derive(Serialize, Deserialize)]
struct ScoreboardRecord {
    event: i32,
    owner_id: u64,
    members: BTreeMap<u64, MemberRecord>,
}

/// On-disk shape of a member; tasks are keyed by day.
#[derive(Serialize, Deserialize)]
struct MemberRecord {
    id: u64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    alias: Option<String>,
    local_score: i64,
    global_score: i64,
    #[serde(default)]
    stars: u32,
    #[serde(default)]
    completed_tasks: BTreeMap<u8, Vec<DateTime<Utc>>>,
}

impl ScoreboardRecord {
    fn capture(board: &Scoreboard) -> Self {
        let members = board
            .members()
            .map(|m| {
                let record = MemberRecord {
                    id: m.id(),
                    name: m.name().map(str::to_string),
                    alias: m.alias().map(str::to_string),
                    local_score: m.local_score(),
                    global_score: m.global_score(),
                    stars: m.stars(),
                    completed_tasks: m
                        .tasks()
                        .map(|task| (task.day(), task.levels().to_vec()))
                        .collect(),
                };
                (m.id(), record)
            })
            .collect();
        Self { event: board.event_year(), owner_id: board.owner_id(), members }
    }

    fn restore(self) -> Result<Scoreboard, ModelError> {
        let mut board = Scoreboard::empty(ResourceKey::new(self.event, self.owner_id));
        for (key, member) in self.members {
            if key != member.id {
                return Err(ModelError::MemberKeyMismatch { key, member: member.id });
            }
            let mut built = Member::new(member.id)
                .with_name(member.name)
                .with_alias(member.alias)
                .with_scores(member.local_score, member.global_score)
                .with_stars(member.stars);
            for (day, levels) in member.completed_tasks {
                built = built.with_task(DayTask::with_levels(i64::from(day), levels)?);
            }
            board.add_member(built);
        }
        Ok(board)
    }
}

impl Serialize for Scoreboard {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ScoreboardRecord::capture(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Scoreboard {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let record = ScoreboardRecord::deserialize(deserializer)?;
        record.restore().map_err(serde::de::Error::custom)
    }
}
