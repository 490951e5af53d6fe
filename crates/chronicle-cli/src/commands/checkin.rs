use chrono::Utc;
use clap::Args;
use chronicle_core::{Database, Outcome};

use super::parse_date_arg;

#[derive(Args)]
pub struct CheckinArgs {
    /// Goal ID
    pub goal_id: String,
    /// Outcome: completed, partial or missed
    #[arg(long, default_value = "completed")]
    pub outcome: String,
    /// Day of the check-in (YYYY-MM-DD); defaults to today (UTC)
    #[arg(long)]
    pub date: Option<String>,
    /// Free-form note
    #[arg(long)]
    pub note: Option<String>,
}

pub fn run(args: CheckinArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut db = Database::open()?;
    let outcome = args.outcome.parse::<Outcome>()?;
    let today = Utc::now().date_naive();
    let day = match args.date.as_deref() {
        Some(raw) => parse_date_arg(raw)?,
        None => today,
    };

    let chapter = db.record_checkin(&args.goal_id, day, outcome, args.note.as_deref(), today)?;
    println!("{}", serde_json::to_string_pretty(&chapter)?);
    Ok(())
}
