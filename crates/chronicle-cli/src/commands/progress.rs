use clap::Args;
use chronicle_core::{Config, Database, ProgressService};

#[derive(Args)]
pub struct ProgressArgs {
    /// Goal ID
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub goal_id: Option<String>,
    /// Show progress for every goal
    #[arg(long)]
    pub all: bool,
}

pub fn run(args: ProgressArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let db = Database::open()?;
    let service = ProgressService::new(&db, &config.network);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    let json = match args.goal_id {
        Some(goal_id) => {
            let progress = runtime.block_on(service.goal_progress(&goal_id))?;
            serde_json::to_string_pretty(&progress)?
        }
        None => {
            let summaries = runtime.block_on(service.all_progress())?;
            serde_json::to_string_pretty(&summaries)?
        }
    };
    println!("{json}");
    Ok(())
}
