//! Text rendering of scoreboard changes for chat sinks.
//!
//! A message has two parts: the ranked board inside a code fence, then a
//! list of the tasks each member completed since the previous snapshot.
//! The second part is left out when nobody completed anything new.

use std::fmt::Write;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};

use crate::change::{detect, Change, RankMovement};
use crate::model::{DayTask, Member, Scoreboard, FIRST_DAY, LAST_DAY};
use crate::ports::{Clock, Renderer};

/// Column width used for names when the board has no members.
const MIN_NAME_WIDTH: usize = 6;

const TIME_FORMAT: &str = "%a %d.%m. %H:%M";

/// Target markup dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// Slack `mrkdwn`.
    Slack,
    /// Discord markdown.
    Discord,
    /// No markup, for terminals.
    Plain,
}

impl Style {
    fn locked_day(self) -> &'static str {
        match self {
            Self::Slack => "\u{1680}\u{1680}",
            Self::Discord => "\u{2587}",
            Self::Plain => " ",
        }
    }

    fn missed_day(self) -> &'static str {
        match self {
            Self::Slack => "\u{1680}\u{1680}",
            Self::Discord => "\u{2587}",
            Self::Plain => ".",
        }
    }

    /// Day numbers above the star strip, aligned to the glyph widths.
    fn day_header(self) -> &'static str {
        match self {
            Self::Slack => "       5      10       15      20       25",
            Self::Discord => "    5     10    15     20    25",
            Self::Plain => "     5    10    15    20    25",
        }
    }

    fn bold(self, text: &str) -> String {
        match self {
            Self::Slack => format!("*{text}*"),
            Self::Discord => format!("**{text}**"),
            Self::Plain => text.to_string(),
        }
    }
}

/// Renders changes as a ranked board plus a list of new completions.
pub struct BoardRenderer {
    style: Style,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
}

impl BoardRenderer {
    /// Creates a renderer showing times at `offset` from UTC.
    #[must_use]
    pub fn new(style: Style, clock: Arc<dyn Clock>, offset: FixedOffset) -> Self {
        Self { style, clock, offset }
    }

    /// Renders a single snapshot, as if it had just been observed.
    #[must_use]
    pub fn render_board(&self, board: &Scoreboard) -> String {
        self.render(&detect(None, board.clone()))
    }

    fn board_section(&self, change: &Change, now: DateTime<Utc>) -> String {
        let board = change.current();
        let width = board
            .members()
            .map(|m| m.display_name().chars().count())
            .max()
            .unwrap_or(MIN_NAME_WIDTH);

        let mut out = String::from("```\n");
        let _ = writeln!(
            out,
            "AoC y={:04}{}\t{:<width$}  Last finished task",
            board.event_year(),
            self.style.day_header(),
            "Member",
        );
        for (rank, member) in board.ranked().into_iter().enumerate() {
            let last = member.last_finished_task().map(|t| self.task_line(t)).unwrap_or_default();
            let row = format!(
                "{:>2}) {:>3} {}\t{:<width$} {} {}",
                rank + 1,
                member.local_score(),
                self.star_strip(board, member, now),
                member.display_name(),
                last,
                marker(change.rank_movement(member.id())),
            );
            out.push_str(row.trim_end());
            out.push('\n');
        }
        out.push_str("```");
        out
    }

    fn news_section(&self, change: &Change, now: DateTime<Utc>) -> Option<String> {
        let members = change.members_with_new_tasks();
        if members.is_empty() {
            return None;
        }

        let mut out = self.style.bold(&format!("New completions up to {}:", self.local(now)));
        for member in members {
            let _ = write!(out, "\n{} completed:", self.style.bold(&member.display_name()));
            let mut tasks: Vec<&DayTask> = change.newly_completed_tasks(member.id()).collect();
            tasks.sort_by(|a, b| a.presentation_cmp(b));
            for task in tasks {
                let _ = write!(out, "\n- {}", self.task_line(task).trim_start());
            }
        }
        Some(out)
    }

    /// One glyph per day, with a bar after every fifth day.
    fn star_strip(&self, board: &Scoreboard, member: &Member, now: DateTime<Utc>) -> String {
        let local_now = now.with_timezone(&self.offset).naive_local();
        let mut strip = String::from("|");
        for day in FIRST_DAY..=LAST_DAY {
            let unlocked = board.unlock_time(day).is_ok_and(|unlock| local_now > unlock);
            if unlocked {
                strip.push_str(self.star(member.task_for(day)));
            } else {
                strip.push_str(self.style.locked_day());
            }
            if day % 5 == 0 {
                strip.push('|');
            }
        }
        strip
    }

    fn star(&self, task: Option<&DayTask>) -> &'static str {
        match task.map_or(0, DayTask::completed_levels) {
            0 => self.style.missed_day(),
            1 => "\u{2606}",
            _ => "\u{2605}",
        }
    }

    fn task_line(&self, task: &DayTask) -> String {
        let finished = task.last_completion().map(|at| self.local(at)).unwrap_or_default();
        format!("{:>2}. {} at {}", task.day(), self.star(Some(task)), finished)
    }

    fn local(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.offset).format(TIME_FORMAT).to_string()
    }
}

impl Renderer for BoardRenderer {
    fn render(&self, change: &Change) -> String {
        let now = self.clock.now();
        let board = self.board_section(change, now);
        match self.news_section(change, now) {
            Some(news) => format!("{board}\n{news}"),
            None => board,
        }
    }
}

fn marker(movement: RankMovement) -> &'static str {
    match movement {
        RankMovement::Up => "\u{2191}",
        RankMovement::Down => "\u{2193}",
        RankMovement::Starred => "*",
        RankMovement::Unchanged => "",
    }
}
