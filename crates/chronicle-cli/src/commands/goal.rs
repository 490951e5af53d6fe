use chrono::{Duration, Utc};
use clap::Subcommand;
use chronicle_core::{Cadence, Config, CoreError, Database};

use super::parse_date_arg;

#[derive(Subcommand)]
pub enum GoalAction {
    /// Create a goal
    Add {
        /// Goal title
        title: String,
        /// Check-in cadence: daily, weekdays or weekly
        #[arg(long)]
        cadence: Option<String>,
        /// Target date (YYYY-MM-DD); defaults to goals.default_duration_days from now
        #[arg(long)]
        target: Option<String>,
    },
    /// List all goals
    List,
    /// Show a goal
    Show {
        /// Goal ID
        id: String,
    },
    /// List a goal's chapters
    Chapters {
        /// Goal ID
        id: String,
    },
    /// Delete a goal and its chapters
    Remove {
        /// Goal ID
        id: String,
    },
}

pub fn run(action: GoalAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut db = Database::open()?;

    match action {
        GoalAction::Add {
            title,
            cadence,
            target,
        } => {
            let config = Config::load_or_default();
            let cadence = match cadence {
                Some(raw) => raw.parse::<Cadence>()?,
                None => config.goals.default_cadence,
            };
            let now = Utc::now();
            let target_date = match target {
                Some(raw) => parse_date_arg(&raw)?
                    .and_hms_opt(0, 0, 0)
                    .map(|naive| naive.and_utc())
                    .ok_or("invalid target date")?,
                None => now + Duration::days(i64::from(config.goals.default_duration_days)),
            };
            let goal = db.create_goal(&title, cadence, now, target_date)?;
            println!("{}", serde_json::to_string_pretty(&goal)?);
        }
        GoalAction::List => {
            let goals = db.list_goals()?;
            println!("{}", serde_json::to_string_pretty(&goals)?);
        }
        GoalAction::Show { id } => {
            let goal = db.get_goal(&id)?.ok_or(CoreError::NotFound {
                entity: "goal",
                id: id.clone(),
            })?;
            println!("{}", serde_json::to_string_pretty(&goal)?);
        }
        GoalAction::Chapters { id } => {
            if db.get_goal(&id)?.is_none() {
                return Err(CoreError::NotFound { entity: "goal", id }.into());
            }
            let chapters = db.list_chapters(&id)?;
            println!("{}", serde_json::to_string_pretty(&chapters)?);
        }
        GoalAction::Remove { id } => {
            db.delete_goal(&id)?;
            println!("goal {id} removed");
        }
    }
    Ok(())
}
