//! # Habit Chronicle Core Library
//!
//! Goals collect "chapters": one check-in per day, plus the `origin` chapter
//! written when the goal is created. This crate derives streaks and progress
//! from those chapters and owns their storage. The `chronicle` CLI is a thin
//! layer over it.
//!
//! ## Architecture
//!
//! - **Progress**: a pure calculator from a goal and its chapters to
//!   [`GoalProgress`] (counts, current and longest streak, due-today)
//! - **Retry**: timeout and exponential-backoff helpers for store reads
//! - **Stores**: [`GoalStore`] / [`ChapterStore`] traits, implemented by the
//!   SQLite [`Database`]
//! - **Service**: [`ProgressService`] ties the stores to the calculator
//! - **Storage**: SQLite persistence and TOML-based [`Config`]

pub mod chapter;
pub mod error;
pub mod goal;
pub mod progress;
pub mod retry;
pub mod service;
pub mod storage;
pub mod store;

pub use chapter::{Chapter, Outcome};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use goal::{Cadence, Goal};
pub use progress::{compute_progress, compute_progress_at, GoalProgress};
pub use retry::{run_with_retry, with_timeout, with_timeout_and_retry, RetryOptions, TimeoutError};
pub use service::{GoalSummary, ProgressService};
pub use storage::{Config, Database};
pub use store::{ChapterStore, GoalStore};
