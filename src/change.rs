//! Comparison of two consecutive scoreboard snapshots.
//!
//! A [`Change`] is just the pair of snapshots. Nothing is diffed up front;
//! the queries below walk the snapshots lazily when a renderer asks.

use chrono::{DateTime, Utc};

use crate::model::{DayTask, Member, Rank, Scoreboard};

/// Two consecutive snapshots of the same scoreboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    previous: Option<Scoreboard>,
    current: Scoreboard,
}

/// How a member's rank moved between the two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankMovement {
    /// Ranked higher than before.
    Up,
    /// Ranked lower than before.
    Down,
    /// Same rank, but the member earned a new star.
    Starred,
    /// Nothing to report.
    Unchanged,
}

/// Pairs `previous` and `current` into a [`Change`].
#[must_use]
pub fn detect(previous: Option<Scoreboard>, current: Scoreboard) -> Change {
    Change { previous, current }
}

impl Change {
    /// The newer snapshot.
    #[must_use]
    pub fn current(&self) -> &Scoreboard {
        &self.current
    }

    /// Consumes the change, keeping the newer snapshot.
    #[must_use]
    pub fn into_current(self) -> Scoreboard {
        self.current
    }

    /// Whether anyone earned a star since `previous`.
    ///
    /// Always true when there is no previous snapshot.
    #[must_use]
    pub fn has_changed(&self) -> bool {
        self.previous
            .as_ref()
            .map_or(true, |previous| previous.last_earned_at() != self.current.last_earned_at())
    }

    /// Whether the member's last star differs between the snapshots.
    ///
    /// False when there is no previous snapshot.
    #[must_use]
    pub fn has_changed_for_member(&self, member_id: u64) -> bool {
        self.previous.as_ref().is_some_and(|previous| {
            last_star_of(previous, member_id) != last_star_of(&self.current, member_id)
        })
    }

    /// Tasks of `member_id` completed after the member's last star in `previous`.
    ///
    /// Empty when `previous` is absent or has no members. A member missing
    /// from `previous` has no cutoff, so all of their completions count.
    pub fn newly_completed_tasks(&self, member_id: u64) -> impl Iterator<Item = &DayTask> + '_ {
        let cutoff = self
            .previous
            .as_ref()
            .filter(|previous| !previous.is_empty())
            .map(|previous| last_star_of(previous, member_id));

        cutoff
            .and(self.current.member(member_id))
            .into_iter()
            .flat_map(Member::tasks)
            .filter(move |task| cutoff.is_some_and(|cutoff| task.last_completion() > cutoff))
    }

    /// Members of `current` with at least one newly completed task, by display name.
    #[must_use]
    pub fn members_with_new_tasks(&self) -> Vec<&Member> {
        let mut members: Vec<&Member> = self
            .current
            .members()
            .filter(|member| self.newly_completed_tasks(member.id()).next().is_some())
            .collect();
        members.sort_by_key(|member| member.display_name());
        members
    }

    /// Rank movement of `member_id` from `previous` to `current`.
    #[must_use]
    pub fn rank_movement(&self, member_id: u64) -> RankMovement {
        let current = self.current.rank_of(member_id);
        let previous = self.previous.as_ref().map_or(current, |p| p.rank_of(member_id));

        if current == previous && self.has_changed_for_member(member_id) {
            RankMovement::Starred
        } else if current == previous || previous == Rank::Unranked {
            RankMovement::Unchanged
        } else if current > previous {
            RankMovement::Down
        } else {
            RankMovement::Up
        }
    }
}

fn last_star_of(board: &Scoreboard, member_id: u64) -> Option<DateTime<Utc>> {
    board.member(member_id).and_then(Member::last_star_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceKey;
    use chrono::TimeZone;

    const ALICE: u64 = 1;
    const BOB: u64 = 2;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 12, day, hour, 0, 0).unwrap()
    }

    fn board(members: Vec<Member>) -> Scoreboard {
        let mut board = Scoreboard::empty(ResourceKey::new(2023, 77));
        for member in members {
            board.add_member(member);
        }
        board
    }

    fn member(id: u64, name: &str, score: i64, tasks: Vec<DayTask>) -> Member {
        tasks
            .into_iter()
            .fold(Member::new(id).with_name(Some(name.into())).with_scores(score, 0), Member::with_task)
    }

    fn task(day: i64, levels: &[DateTime<Utc>]) -> DayTask {
        DayTask::with_levels(day, levels.iter().copied()).unwrap()
    }

    fn days(change: &Change, id: u64) -> Vec<(u8, usize)> {
        change.newly_completed_tasks(id).map(|t| (t.day(), t.completed_levels())).collect()
    }

    #[test]
    fn missing_previous_always_counts_as_changed() {
        let change = detect(None, board(vec![]));
        assert!(change.has_changed());

        let change = detect(None, board(vec![member(ALICE, "alice", 1, vec![task(1, &[at(1, 6)])])]));
        assert!(change.has_changed());
    }

    #[test]
    fn identical_snapshots_never_change() {
        let snapshot = board(vec![
            member(ALICE, "alice", 3, vec![task(1, &[at(1, 6), at(1, 7)])]),
            member(BOB, "bob", 1, vec![task(1, &[at(1, 9)])]),
        ]);
        let change = detect(Some(snapshot.clone()), snapshot);
        assert!(!change.has_changed());
        assert!(!change.has_changed_for_member(ALICE));
        assert_eq!(change.newly_completed_tasks(ALICE).count(), 0);
        assert!(change.members_with_new_tasks().is_empty());
    }

    #[test]
    fn nothing_is_new_without_a_previous_snapshot() {
        let current = board(vec![member(ALICE, "alice", 1, vec![task(1, &[at(1, 6)])])]);
        let change = detect(None, current);
        assert!(days(&change, ALICE).is_empty());
        assert!(!change.has_changed_for_member(ALICE));
    }

    #[test]
    fn nothing_is_new_against_an_empty_previous_snapshot() {
        let current = board(vec![member(ALICE, "alice", 1, vec![task(1, &[at(1, 6)])])]);
        let change = detect(Some(board(vec![])), current);
        assert!(change.has_changed());
        assert!(days(&change, ALICE).is_empty());
    }

    #[test]
    fn newcomer_reports_every_completion_once() {
        let previous = board(vec![member(BOB, "bob", 1, vec![task(1, &[at(1, 9)])])]);
        let current = board(vec![
            member(BOB, "bob", 1, vec![task(1, &[at(1, 9)])]),
            member(ALICE, "alice", 1, vec![task(1, &[at(1, 10)])]),
        ]);
        let change = detect(Some(previous), current.clone());
        assert!(change.has_changed());
        assert_eq!(days(&change, ALICE), vec![(1, 1)]);

        let next = detect(Some(current.clone()), current);
        assert!(days(&next, ALICE).is_empty());
    }

    #[test]
    fn only_completions_after_last_seen_star_are_new() {
        let previous =
            board(vec![member(ALICE, "alice", 2, vec![task(1, &[at(1, 6)]), task(3, &[at(3, 8)])])]);
        let current = board(vec![member(
            ALICE,
            "alice",
            5,
            vec![task(1, &[at(1, 6)]), task(2, &[at(3, 9)]), task(3, &[at(3, 8)])],
        )]);
        let change = detect(Some(previous), current);

        assert!(change.has_changed_for_member(ALICE));
        assert_eq!(days(&change, ALICE), vec![(2, 1)]);
    }

    #[test]
    fn second_level_of_an_old_day_is_new() {
        let previous = board(vec![member(ALICE, "alice", 1, vec![task(1, &[at(1, 6)])])]);
        let current = board(vec![member(ALICE, "alice", 2, vec![task(1, &[at(1, 6), at(2, 6)])])]);
        let change = detect(Some(previous), current);
        assert_eq!(days(&change, ALICE), vec![(1, 2)]);
    }

    #[test]
    fn unchanged_member_has_no_news_while_others_progress() {
        let previous = board(vec![
            member(ALICE, "alice", 1, vec![task(1, &[at(1, 6)])]),
            member(BOB, "bob", 1, vec![task(1, &[at(1, 7)])]),
        ]);
        let current = board(vec![
            member(ALICE, "alice", 1, vec![task(1, &[at(1, 6)])]),
            member(BOB, "bob", 3, vec![task(1, &[at(1, 7), at(1, 8)])]),
        ]);
        let change = detect(Some(previous), current);
        assert!(change.has_changed());
        assert!(!change.has_changed_for_member(ALICE));
        assert!(change.has_changed_for_member(BOB));
        let names: Vec<String> =
            change.members_with_new_tasks().iter().map(|m| m.display_name()).collect();
        assert_eq!(names, vec!["bob"]);
    }

    #[test]
    fn rank_movement_reports_overtakes_and_new_stars() {
        let previous = board(vec![
            member(ALICE, "alice", 4, vec![task(1, &[at(1, 6)])]),
            member(BOB, "bob", 2, vec![task(1, &[at(1, 7)])]),
        ]);
        let current = board(vec![
            member(ALICE, "alice", 4, vec![task(1, &[at(1, 6)])]),
            member(BOB, "bob", 6, vec![task(1, &[at(1, 7), at(1, 8)])]),
        ]);
        let change = detect(Some(previous.clone()), current);
        assert_eq!(change.rank_movement(BOB), RankMovement::Up);
        assert_eq!(change.rank_movement(ALICE), RankMovement::Down);

        let starred = board(vec![
            member(ALICE, "alice", 6, vec![task(1, &[at(1, 6), at(1, 9)])]),
            member(BOB, "bob", 2, vec![task(1, &[at(1, 7)])]),
        ]);
        let change = detect(Some(previous), starred);
        assert_eq!(change.rank_movement(ALICE), RankMovement::Starred);
        assert_eq!(change.rank_movement(BOB), RankMovement::Unchanged);
    }

    #[test]
    fn newcomer_rank_is_not_a_movement() {
        let previous = board(vec![member(ALICE, "alice", 1, vec![])]);
        let current = board(vec![member(ALICE, "alice", 1, vec![]), member(BOB, "bob", 9, vec![])]);
        let change = detect(Some(previous), current);
        assert_eq!(change.rank_movement(BOB), RankMovement::Unchanged);
    }
}
