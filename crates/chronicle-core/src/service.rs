//! Progress lookups over injected stores.
//!
//! Each store read runs under its own timeout and retry budget, taken from
//! [`NetworkConfig`]. The goal and its chapters are read separately.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chapter::Chapter;
use crate::error::{CoreError, Result};
use crate::goal::Goal;
use crate::progress::{compute_progress_at, GoalProgress};
use crate::retry::{with_timeout_and_retry, RetryOptions};
use crate::storage::NetworkConfig;
use crate::store::{ChapterStore, GoalStore};

/// A goal paired with its computed progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalSummary {
    pub goal: Goal,
    pub progress: GoalProgress,
}

/// Computes [`GoalProgress`] from whatever store it is given.
pub struct ProgressService<S> {
    store: S,
    timeout: Duration,
    retry: RetryOptions,
}

impl<S> ProgressService<S>
where
    S: GoalStore + ChapterStore,
{
    pub fn new(store: S, network: &NetworkConfig) -> Self {
        Self::with_options(store, network.timeout(), network.retry_options())
    }

    pub fn with_options(store: S, timeout: Duration, retry: RetryOptions) -> Self {
        Self {
            store,
            timeout,
            retry,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn goal_progress(&self, goal_id: &str) -> Result<GoalProgress> {
        self.goal_progress_at(goal_id, Utc::now()).await
    }

    /// # Errors
    /// `NotFound` if the goal does not exist; otherwise the last store or
    /// timeout error once the retry budget is spent.
    pub async fn goal_progress_at(&self, goal_id: &str, now: DateTime<Utc>) -> Result<GoalProgress> {
        let goal = self.load_goal(goal_id).await?;
        let chapters = self.load_chapters(goal_id).await?;
        Ok(compute_progress_at(&goal, &chapters, now))
    }

    pub async fn all_progress(&self) -> Result<Vec<GoalSummary>> {
        self.all_progress_at(Utc::now()).await
    }

    /// Progress for every goal, in store order.
    pub async fn all_progress_at(&self, now: DateTime<Utc>) -> Result<Vec<GoalSummary>> {
        let store = &self.store;
        let goals = with_timeout_and_retry(
            move || async move { store.goals() },
            self.timeout,
            "Timed out loading goals",
            &self.retry,
        )
        .await?;

        let mut summaries = Vec::with_capacity(goals.len());
        for goal in goals {
            let chapters = self.load_chapters(&goal.id).await?;
            let progress = compute_progress_at(&goal, &chapters, now);
            summaries.push(GoalSummary { goal, progress });
        }
        Ok(summaries)
    }

    async fn load_goal(&self, goal_id: &str) -> Result<Goal> {
        let store = &self.store;
        with_timeout_and_retry(
            move || async move { store.goal(goal_id) },
            self.timeout,
            "Timed out loading goal",
            &self.retry,
        )
        .await?
        .ok_or_else(|| CoreError::goal_not_found(goal_id))
    }

    async fn load_chapters(&self, goal_id: &str) -> Result<Vec<Chapter>> {
        let store = &self.store;
        with_timeout_and_retry(
            move || async move { store.chapters_for_goal(goal_id) },
            self.timeout,
            "Timed out loading chapters",
            &self.retry,
        )
        .await
    }
}
