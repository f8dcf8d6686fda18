use clap::Subcommand;
use dialtimer_core::{Database, TimerStore};
use uuid::Uuid;

use super::CliResult;

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List archived timers as JSON, oldest first
    List {
        /// Only the most recent N entries
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Delete one archived timer
    Remove {
        id: Uuid,
    },
    /// Delete all archived timers
    Clear,
}

pub fn run(action: HistoryAction) -> CliResult {
    let store = TimerStore::new(Database::open()?);

    match action {
        HistoryAction::List { limit } => {
            let history = store.load_history();
            let skip = limit.map_or(0, |n| history.len().saturating_sub(n));
            println!("{}", serde_json::to_string_pretty(&history[skip..])?);
        }
        HistoryAction::Remove { id } => {
            if !store.remove_from_history(id)? {
                return Err(format!("no archived timer with id {id}").into());
            }
            println!("removed {id}");
        }
        HistoryAction::Clear => {
            store.clear_history()?;
            println!("history cleared");
        }
    }
    Ok(())
}
