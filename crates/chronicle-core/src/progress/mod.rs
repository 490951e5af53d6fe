//! Goal progress derived from a goal's chapters.
//!
//! [`compute_progress_at`] is a pure function of the goal, its chapters and
//! the supplied clock. It copies the chapters before sorting, so the caller's
//! slice is never reordered, and two calls with the same inputs return equal
//! results.
//!
//! Chapters whose `date` cannot be parsed still count toward the totals and
//! outcome buckets, but they take no part in streaks or in
//! `last_check_in_date`.

mod streak;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::chapter::{Chapter, Outcome};
use crate::goal::Goal;

use streak::{current_streak, longest_streak, DatedChapter};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Derived progress for one goal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub total_chapters: u32,
    pub completed_checkins: u32,
    pub partial_checkins: u32,
    pub missed_checkins: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    /// Whole days since the goal was created, rounded up
    pub days_elapsed: i64,
    /// Whole days until the target date, rounded up; negative once passed
    pub days_until_target: i64,
    /// No successful chapter is recorded for today yet
    pub is_due_today: bool,
    /// `date` of the most recent chapter
    pub last_check_in_date: Option<String>,
    /// Completed check-ins as a percentage of all non-origin check-ins
    pub completion_rate: f64,
}

/// Compute progress against the current clock.
pub fn compute_progress(goal: &Goal, chapters: &[Chapter]) -> GoalProgress {
    compute_progress_at(goal, chapters, Utc::now())
}

/// Compute progress as seen at `now`.
pub fn compute_progress_at(goal: &Goal, chapters: &[Chapter], now: DateTime<Utc>) -> GoalProgress {
    let mut completed = 0u32;
    let mut partial = 0u32;
    let mut missed = 0u32;
    for chapter in chapters {
        match chapter.outcome {
            Outcome::Completed => completed += 1,
            Outcome::Partial => partial += 1,
            Outcome::Missed => missed += 1,
            Outcome::Origin => {}
        }
    }

    let mut dated: Vec<DatedChapter<'_>> = Vec::with_capacity(chapters.len());
    for chapter in chapters {
        match DatedChapter::new(chapter) {
            Some(entry) => dated.push(entry),
            None => tracing::debug!(
                chapter_id = %chapter.id,
                date = %chapter.date,
                "skipping chapter with unparsable date"
            ),
        }
    }
    dated.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then(a.chapter.chapter_index.cmp(&b.chapter.chapter_index))
    });

    let mut longest = longest_streak(&dated);
    if longest == 0 && completed > 0 {
        longest = 1;
    }
    let last_check_in_date = dated.last().map(|entry| entry.chapter.date.clone());

    dated.reverse();
    let current = current_streak(&dated, now.date_naive());

    let today = now.format("%Y-%m-%d").to_string();
    let checked_in_today = chapters
        .iter()
        .any(|c| c.date.starts_with(&today) && c.outcome.is_success());

    GoalProgress {
        total_chapters: saturating_count(chapters.len()),
        completed_checkins: completed,
        partial_checkins: partial,
        missed_checkins: missed,
        current_streak: current,
        longest_streak: longest,
        days_elapsed: ceil_days((now - goal.created_at).abs()),
        days_until_target: ceil_days(goal.target_date - now),
        is_due_today: !checked_in_today,
        last_check_in_date,
        completion_rate: percentage(completed, completed + partial + missed),
    }
}

/// Round a signed duration up to whole days.
fn ceil_days(delta: Duration) -> i64 {
    let millis = delta.num_milliseconds();
    if millis > 0 {
        (millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
    } else {
        // integer division truncates toward zero, which is the ceiling here
        millis / MILLIS_PER_DAY
    }
}

fn saturating_count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

fn percentage(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        0.0
    } else {
        f64::from(part) / f64::from(whole) * 100.0
    }
}
