//! Read-side collaborators of the progress service.
//!
//! Services take these as explicit handles instead of reaching for a shared
//! client. [`Database`] implements both.

use crate::chapter::Chapter;
use crate::error::Result;
use crate::goal::Goal;
use crate::storage::Database;

/// Supplies goals by id.
pub trait GoalStore {
    fn goal(&self, id: &str) -> Result<Option<Goal>>;

    fn goals(&self) -> Result<Vec<Goal>>;
}

/// Supplies the chapters of a goal, in no particular order.
pub trait ChapterStore {
    fn chapters_for_goal(&self, goal_id: &str) -> Result<Vec<Chapter>>;
}

impl GoalStore for Database {
    fn goal(&self, id: &str) -> Result<Option<Goal>> {
        self.get_goal(id)
    }

    fn goals(&self) -> Result<Vec<Goal>> {
        self.list_goals()
    }
}

impl ChapterStore for Database {
    fn chapters_for_goal(&self, goal_id: &str) -> Result<Vec<Chapter>> {
        self.list_chapters(goal_id)
    }
}

impl<T: GoalStore + ?Sized> GoalStore for &T {
    fn goal(&self, id: &str) -> Result<Option<Goal>> {
        (**self).goal(id)
    }

    fn goals(&self) -> Result<Vec<Goal>> {
        (**self).goals()
    }
}

impl<T: ChapterStore + ?Sized> ChapterStore for &T {
    fn chapters_for_goal(&self, goal_id: &str) -> Result<Vec<Chapter>> {
        (**self).chapters_for_goal(goal_id)
    }
}
