//! Goals: user-defined habit targets.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// How often a goal expects a check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    #[default]
    Daily,
    Weekdays,
    Weekly,
}

impl Cadence {
    pub fn as_str(self) -> &'static str {
        match self {
            Cadence::Daily => "daily",
            Cadence::Weekdays => "weekdays",
            Cadence::Weekly => "weekly",
        }
    }
}

impl FromStr for Cadence {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Cadence::Daily),
            "weekdays" => Ok(Cadence::Weekdays),
            "weekly" => Ok(Cadence::Weekly),
            other => Err(ValidationError::invalid(
                "cadence",
                format!("expected daily, weekdays or weekly, got '{other}'"),
            )),
        }
    }
}

impl std::fmt::Display for Cadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A habit goal and the window it runs over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub cadence: Cadence,
    pub created_at: DateTime<Utc>,
    pub target_date: DateTime<Utc>,
}

impl Goal {
    /// Build a goal with a fresh id.
    pub fn new(
        title: impl Into<String>,
        cadence: Cadence,
        created_at: DateTime<Utc>,
        target_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            cadence,
            created_at,
            target_date,
        }
    }
}
