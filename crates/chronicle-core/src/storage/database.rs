//! SQLite-based goal and chapter storage.
//!
//! Provides persistent storage for:
//! - Goals and their target windows
//! - Chapters (check-ins), including each goal's `origin` chapter

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::data_dir;
use crate::chapter::{parse_day, Chapter, Outcome};
use crate::error::{CoreError, DatabaseError, Result, ValidationError};
use crate::goal::{Cadence, Goal};

/// Parse an RFC 3339 column, surfacing bad rows as conversion failures.
fn parse_datetime_column(idx: usize, raw: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn parse_enum_column<T>(idx: usize, raw: &str) -> Result<T, rusqlite::Error>
where
    T: std::str::FromStr<Err = ValidationError>,
{
    raw.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_goal(row: &rusqlite::Row) -> Result<Goal, rusqlite::Error> {
    let cadence_str: String = row.get(2)?;
    let created_at_str: String = row.get(3)?;
    let target_date_str: String = row.get(4)?;

    Ok(Goal {
        id: row.get(0)?,
        title: row.get(1)?,
        cadence: parse_enum_column::<Cadence>(2, &cadence_str)?,
        created_at: parse_datetime_column(3, &created_at_str)?,
        target_date: parse_datetime_column(4, &target_date_str)?,
    })
}

fn row_to_chapter(row: &rusqlite::Row) -> Result<Chapter, rusqlite::Error> {
    let outcome_str: String = row.get(4)?;

    Ok(Chapter {
        id: row.get(0)?,
        goal_id: row.get(1)?,
        chapter_index: row.get(2)?,
        date: row.get(3)?,
        outcome: parse_enum_column::<Outcome>(4, &outcome_str)?,
        note: row.get(5)?,
    })
}

/// SQLite database for goals and chapters.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/habit-chronicle/chronicle.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("chronicle.db");
        let conn = Connection::open(&path)
            .map_err(|source| DatabaseError::OpenFailed { path, source })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let db = Self { conn };
        db.migrate()
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS goals (
                id          TEXT PRIMARY KEY,
                title       TEXT NOT NULL,
                cadence     TEXT NOT NULL DEFAULT 'daily',
                created_at  TEXT NOT NULL,
                target_date TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chapters (
                id            TEXT PRIMARY KEY,
                goal_id       TEXT NOT NULL REFERENCES goals(id) ON DELETE CASCADE,
                chapter_index INTEGER NOT NULL,
                date          TEXT NOT NULL,
                outcome       TEXT NOT NULL,
                note          TEXT,
                UNIQUE(goal_id, chapter_index)
            );

            CREATE INDEX IF NOT EXISTS idx_chapters_goal_id ON chapters(goal_id);
            CREATE INDEX IF NOT EXISTS idx_chapters_goal_date ON chapters(goal_id, date);",
        )?;
        Ok(())
    }

    /// Create a goal together with its `origin` chapter.
    ///
    /// # Errors
    /// Returns a validation error for an empty title or a target date that is
    /// not after `created_at`.
    pub fn create_goal(
        &mut self,
        title: &str,
        cadence: Cadence,
        created_at: DateTime<Utc>,
        target_date: DateTime<Utc>,
    ) -> Result<Goal> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::invalid("title", "must not be empty").into());
        }
        if target_date <= created_at {
            return Err(ValidationError::InvalidTimeRange {
                start: created_at,
                end: target_date,
            }
            .into());
        }

        let goal = Goal::new(title, cadence, created_at, target_date);
        let origin = Chapter::new(&goal.id, 0, created_at.to_rfc3339(), Outcome::Origin);

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO goals (id, title, cadence, created_at, target_date)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                goal.id,
                goal.title,
                goal.cadence.as_str(),
                goal.created_at.to_rfc3339(),
                goal.target_date.to_rfc3339(),
            ],
        )?;
        insert_chapter(&tx, &origin)?;
        tx.commit()?;

        tracing::info!(goal_id = %goal.id, title = %goal.title, "goal created");
        Ok(goal)
    }

    pub fn get_goal(&self, id: &str) -> Result<Option<Goal>> {
        let goal = self
            .conn
            .query_row(
                "SELECT id, title, cadence, created_at, target_date FROM goals WHERE id = ?1",
                params![id],
                row_to_goal,
            )
            .optional()?;
        Ok(goal)
    }

    /// All goals, oldest first.
    pub fn list_goals(&self) -> Result<Vec<Goal>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, cadence, created_at, target_date
             FROM goals
             ORDER BY created_at ASC, id ASC",
        )?;
        let goals = stmt
            .query_map([], row_to_goal)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(goals)
    }

    /// Chapters of a goal in `chapter_index` order.
    pub fn list_chapters(&self, goal_id: &str) -> Result<Vec<Chapter>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, goal_id, chapter_index, date, outcome, note
             FROM chapters
             WHERE goal_id = ?1
             ORDER BY chapter_index ASC",
        )?;
        let chapters = stmt
            .query_map(params![goal_id], row_to_chapter)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(chapters)
    }

    /// Append a check-in chapter for `day`.
    ///
    /// # Errors
    /// - `NotFound` if the goal does not exist
    /// - a validation error for an `origin` outcome, a day after `today` or
    ///   before the goal's creation day, or a day that already has a
    ///   non-origin chapter
    pub fn record_checkin(
        &mut self,
        goal_id: &str,
        day: NaiveDate,
        outcome: Outcome,
        note: Option<&str>,
        today: NaiveDate,
    ) -> Result<Chapter> {
        if outcome == Outcome::Origin {
            return Err(ValidationError::invalid(
                "outcome",
                "origin chapters are created with the goal",
            )
            .into());
        }
        if day > today {
            return Err(ValidationError::invalid(
                "date",
                format!("{day} is in the future"),
            )
            .into());
        }

        let tx = self.conn.transaction()?;
        let created_at = tx
            .query_row(
                "SELECT created_at FROM goals WHERE id = ?1",
                params![goal_id],
                |row| {
                    let raw: String = row.get(0)?;
                    parse_datetime_column(0, &raw)
                },
            )
            .optional()?
            .ok_or_else(|| CoreError::goal_not_found(goal_id))?;
        let origin_day = created_at.date_naive();
        if day < origin_day {
            return Err(ValidationError::invalid(
                "date",
                format!("{day} is before the goal started on {origin_day}"),
            )
            .into());
        }

        let day_str = day.format("%Y-%m-%d").to_string();
        let mut same_day = tx.prepare(
            "SELECT date FROM chapters WHERE goal_id = ?1 AND outcome != 'origin'",
        )?;
        let duplicate = same_day
            .query_map(params![goal_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?
            .iter()
            .any(|date| parse_day(date) == Some(day));
        drop(same_day);
        if duplicate {
            return Err(ValidationError::AlreadyCheckedIn {
                goal_id: goal_id.to_string(),
                date: day,
            }
            .into());
        }

        let next_index: u32 = tx.query_row(
            "SELECT COALESCE(MAX(chapter_index) + 1, 0) FROM chapters WHERE goal_id = ?1",
            params![goal_id],
            |row| row.get(0),
        )?;

        let mut chapter = Chapter::new(goal_id, next_index, day_str, outcome);
        chapter.note = note.map(str::to_string);
        insert_chapter(&tx, &chapter)?;
        tx.commit()?;

        tracing::info!(
            goal_id,
            chapter_index = chapter.chapter_index,
            outcome = %chapter.outcome,
            "check-in recorded"
        );
        Ok(chapter)
    }

    /// Delete a goal and, through the cascade, its chapters.
    pub fn delete_goal(&self, id: &str) -> Result<()> {
        let removed = self
            .conn
            .execute("DELETE FROM goals WHERE id = ?1", params![id])?;
        if removed == 0 {
            return Err(CoreError::goal_not_found(id));
        }
        tracing::info!(goal_id = id, "goal deleted");
        Ok(())
    }
}

fn insert_chapter(conn: &Connection, chapter: &Chapter) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO chapters (id, goal_id, chapter_index, date, outcome, note)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            chapter.id,
            chapter.goal_id,
            chapter.chapter_index,
            chapter.date,
            chapter.outcome.as_str(),
            chapter.note,
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, d).unwrap()
    }

    fn db_with_goal() -> (Database, Goal) {
        let mut db = Database::open_memory().unwrap();
        let goal = db
            .create_goal("Meditate", Cadence::Daily, created(), created() + Duration::days(30))
            .unwrap();
        (db, goal)
    }

    #[test]
    fn create_goal_inserts_origin_chapter() {
        let (db, goal) = db_with_goal();
        let chapters = db.list_chapters(&goal.id).unwrap();
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].outcome, Outcome::Origin);
        assert_eq!(chapters[0].chapter_index, 0);
        assert_eq!(chapters[0].day(), Some(date(1)));
    }

    #[test]
    fn goal_round_trips() {
        let (db, goal) = db_with_goal();
        assert_eq!(db.get_goal(&goal.id).unwrap(), Some(goal));
        assert_eq!(db.get_goal("missing").unwrap(), None);
    }

    #[test]
    fn create_goal_validates_input() {
        let mut db = Database::open_memory().unwrap();
        assert!(db
            .create_goal("   ", Cadence::Daily, created(), created() + Duration::days(1))
            .is_err());
        let err = db
            .create_goal("Run", Cadence::Weekly, created(), created())
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::InvalidTimeRange { .. })
        ));
        assert!(db.list_goals().unwrap().is_empty());
    }

    #[test]
    fn checkins_get_increasing_indexes() {
        let (mut db, goal) = db_with_goal();
        let first = db
            .record_checkin(&goal.id, date(2), Outcome::Completed, None, date(10))
            .unwrap();
        let second = db
            .record_checkin(&goal.id, date(3), Outcome::Partial, Some("short run"), date(10))
            .unwrap();

        assert_eq!(first.chapter_index, 1);
        assert_eq!(second.chapter_index, 2);
        assert_eq!(second.date, "2026-04-03");

        let chapters = db.list_chapters(&goal.id).unwrap();
        assert_eq!(chapters.len(), 3);
        assert_eq!(chapters[2].note.as_deref(), Some("short run"));
    }

    #[test]
    fn checkin_on_origin_day_is_allowed() {
        let (mut db, goal) = db_with_goal();
        assert!(db
            .record_checkin(&goal.id, date(1), Outcome::Completed, None, date(1))
            .is_ok());
    }

    #[test]
    fn second_checkin_same_day_is_rejected() {
        let (mut db, goal) = db_with_goal();
        db.record_checkin(&goal.id, date(2), Outcome::Missed, None, date(2))
            .unwrap();
        let err = db
            .record_checkin(&goal.id, date(2), Outcome::Completed, None, date(2))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::AlreadyCheckedIn { .. })
        ));
    }

    #[test]
    fn checkin_rejects_origin_future_and_unknown_goal() {
        let (mut db, goal) = db_with_goal();
        assert!(db
            .record_checkin(&goal.id, date(2), Outcome::Origin, None, date(2))
            .is_err());
        assert!(db
            .record_checkin(&goal.id, date(5), Outcome::Completed, None, date(2))
            .is_err());
        let err = db
            .record_checkin("nope", date(2), Outcome::Completed, None, date(2))
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn checkin_before_goal_start_is_rejected() {
        let (mut db, goal) = db_with_goal();
        let err = db
            .record_checkin(&goal.id, date(1) - Duration::days(1), Outcome::Completed, None, date(2))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::InvalidValue { ref field, .. }) if field == "date"
        ));
        assert_eq!(db.list_chapters(&goal.id).unwrap().len(), 1);
    }

    #[test]
    fn delete_goal_cascades_to_chapters() {
        let (mut db, goal) = db_with_goal();
        db.record_checkin(&goal.id, date(2), Outcome::Completed, None, date(2))
            .unwrap();
        db.delete_goal(&goal.id).unwrap();

        assert!(db.get_goal(&goal.id).unwrap().is_none());
        assert!(db.list_chapters(&goal.id).unwrap().is_empty());
        assert!(matches!(
            db.delete_goal(&goal.id),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn list_goals_orders_by_creation() {
        let mut db = Database::open_memory().unwrap();
        let later = db
            .create_goal("Later", Cadence::Weekly, created() + Duration::days(1), created() + Duration::days(9))
            .unwrap();
        let earlier = db
            .create_goal("Earlier", Cadence::Weekdays, created(), created() + Duration::days(9))
            .unwrap();

        let ids: Vec<_> = db.list_goals().unwrap().into_iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![earlier.id, later.id]);
    }
}
