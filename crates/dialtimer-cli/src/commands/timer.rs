use clap::Subcommand;

use super::{print_events, CliResult, Workspace};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start a countdown. Without --secs, starts from the dialed duration
    Start {
        /// Duration in seconds
        #[arg(long)]
        secs: Option<u64>,
        /// Timer name (max 20 characters)
        #[arg(long)]
        name: Option<String>,
    },
    /// Pause the running countdown
    Pause,
    /// Resume a paused countdown
    Resume,
    /// Archive the current run and go back to idle
    Reset,
    /// Mark the task as done
    Complete,
    /// Set name and description before the first start
    Rename {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Print current timer state as JSON
    Status,
}

pub fn run(action: TimerAction) -> CliResult {
    let mut ws = Workspace::open()?;
    let state = ws.session.engine().run_state();

    let accepted = match action {
        TimerAction::Start { secs, name } => match secs {
            Some(secs) => ws.session.start(secs, name.as_deref().unwrap_or("")),
            None => {
                if let Some(name) = name.as_deref() {
                    ws.session.rename(name, "");
                }
                ws.session.start_armed()
            }
        },
        TimerAction::Pause => ws.session.pause(),
        TimerAction::Resume => ws.session.resume(),
        TimerAction::Reset => ws.session.reset(),
        TimerAction::Complete => ws.session.complete(),
        TimerAction::Rename { name, description } => ws.session.rename(&name, &description),
        TimerAction::Status => true,
    };

    // Whatever happened (including an expiry found on restore) gets saved.
    let events = ws.persist()?;
    print_events(&events)?;

    if !accepted {
        return Err(format!("not allowed while timer is {state}").into());
    }

    let snapshot = ws.session.engine().snapshot();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
