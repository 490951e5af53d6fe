//! Streak walks over date-sorted chapters.
//!
//! Both walks work on calendar days: several chapters on one day count once,
//! and a `missed` outcome ends the run.

use chrono::{DateTime, NaiveDate, Utc};

use crate::chapter::{Chapter, Outcome};

/// A chapter whose date parsed successfully.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DatedChapter<'a> {
    pub chapter: &'a Chapter,
    pub timestamp: DateTime<Utc>,
    pub day: NaiveDate,
}

impl<'a> DatedChapter<'a> {
    pub fn new(chapter: &'a Chapter) -> Option<Self> {
        let timestamp = chapter.timestamp()?;
        Some(Self {
            chapter,
            timestamp,
            day: timestamp.date_naive(),
        })
    }

    fn outcome(&self) -> Outcome {
        self.chapter.outcome
    }
}

/// Run of successful days ending at the most recent chapter.
///
/// `newest_first` must be sorted by date descending. The run only counts if
/// the most recent chapter is from today or yesterday.
pub(crate) fn current_streak(newest_first: &[DatedChapter<'_>], today: NaiveDate) -> u32 {
    let Some(latest) = newest_first.first() else {
        return 0;
    };
    if (today - latest.day).num_days() > 1 {
        return 0;
    }

    let mut streak = 0;
    let mut previous: Option<NaiveDate> = None;
    for entry in newest_first {
        if !entry.outcome().is_success() {
            break;
        }
        match previous {
            None => streak = 1,
            Some(prev_day) => match (prev_day - entry.day).num_days() {
                0 => {}
                1 => streak += 1,
                _ => break,
            },
        }
        previous = Some(entry.day);
    }
    streak
}

/// Longest run of successful consecutive days. `oldest_first` must be sorted
/// by date ascending.
pub(crate) fn longest_streak(oldest_first: &[DatedChapter<'_>]) -> u32 {
    let mut run = 0;
    let mut longest = 0;
    let mut previous: Option<NaiveDate> = None;

    for entry in oldest_first {
        if entry.outcome().is_success() {
            match previous {
                None => run = 1,
                Some(prev_day) => match (entry.day - prev_day).num_days() {
                    0 => {}
                    1 => run += 1,
                    _ => run = 1,
                },
            }
        } else {
            run = 0;
        }
        longest = longest.max(run);
        previous = Some(entry.day);
    }
    longest
}
