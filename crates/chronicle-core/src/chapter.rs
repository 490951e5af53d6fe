//! Chapters: the check-in and milestone records attached to a goal.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Recorded result of a check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Goal creation event
    Origin,
    Completed,
    Partial,
    Missed,
}

impl Outcome {
    /// Whether this outcome keeps a streak alive.
    pub fn is_success(self) -> bool {
        match self {
            Outcome::Origin | Outcome::Completed | Outcome::Partial => true,
            Outcome::Missed => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Origin => "origin",
            Outcome::Completed => "completed",
            Outcome::Partial => "partial",
            Outcome::Missed => "missed",
        }
    }
}

impl FromStr for Outcome {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "origin" => Ok(Outcome::Origin),
            "completed" => Ok(Outcome::Completed),
            "partial" => Ok(Outcome::Partial),
            "missed" => Ok(Outcome::Missed),
            other => Err(ValidationError::invalid(
                "outcome",
                format!("expected origin, completed, partial or missed, got '{other}'"),
            )),
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single check-in or milestone belonging to a goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    pub goal_id: String,
    /// Display order within the goal, assigned at creation
    pub chapter_index: u32,
    /// ISO 8601 date or date-time, kept as recorded
    pub date: String,
    pub outcome: Outcome,
    #[serde(default)]
    pub note: Option<String>,
}

impl Chapter {
    /// Build a chapter with a fresh id.
    pub fn new(
        goal_id: impl Into<String>,
        chapter_index: u32,
        date: impl Into<String>,
        outcome: Outcome,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            goal_id: goal_id.into(),
            chapter_index,
            date: date.into(),
            outcome,
            note: None,
        }
    }

    /// Parse `date` as an instant.
    ///
    /// Accepts ISO 8601 date-times with `T` or a space between date and time,
    /// with or without seconds. Date-times without an offset are read as UTC
    /// and a bare `YYYY-MM-DD` is midnight UTC. Returns `None` for anything
    /// else.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        parse_chapter_date(&self.date)
    }

    /// UTC calendar day of the chapter.
    pub fn day(&self) -> Option<NaiveDate> {
        parse_day(&self.date)
    }
}

pub(crate) fn parse_day(raw: &str) -> Option<NaiveDate> {
    parse_chapter_date(raw).map(|ts| ts.date_naive())
}

/// Date-time layouts that carry their own offset.
const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

/// Date-time layouts read as UTC. A trailing `Z` is stripped first.
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

fn parse_chapter_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(dt) = OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(dt.with_timezone(&Utc));
    }

    let local = raw
        .strip_suffix('Z')
        .or_else(|| raw.strip_suffix('z'))
        .unwrap_or(raw);
    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(local, fmt).ok())
    {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
