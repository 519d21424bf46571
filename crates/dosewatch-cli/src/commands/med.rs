use clap::Subcommand;
use dosewatch_core::{DoseStore, SqliteStore};

#[derive(Subcommand)]
pub enum MedAction {
    /// Add a dose schedule for an individual
    Add {
        medication: String,
        /// Scheduled time of day, e.g. "08:00"
        time: String,
        doses_remaining: u32,
        individual_id: i64,
    },
    /// Update a dose schedule's time and remaining count
    Update {
        id: i64,
        time: String,
        doses_remaining: u32,
    },
    /// List dose schedules
    List,
    /// Remove a dose schedule
    Remove { id: i64 },
    /// Record the current dose as taken
    Confirm { id: i64 },
}

pub fn run(action: MedAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteStore::open()?;
    match action {
        MedAction::Add {
            medication,
            time,
            doses_remaining,
            individual_id,
        } => {
            let id = store.add_dose(&medication, &time, doses_remaining, individual_id)?;
            println!("medication added: {id}");
        }
        MedAction::Update {
            id,
            time,
            doses_remaining,
        } => {
            store.update_dose(id, &time, doses_remaining)?;
            println!("ok");
        }
        MedAction::List => {
            let json = serde_json::to_string_pretty(&store.doses()?)?;
            println!("{json}");
        }
        MedAction::Remove { id } => {
            store.remove_dose(id)?;
            println!("ok");
        }
        MedAction::Confirm { id } => {
            if store.dose(id)?.is_none() {
                eprintln!("unknown medication: {id}");
                std::process::exit(1);
            }
            store.update_confirmation(id, true)?;
            println!("adherence recorded");
        }
    }
    Ok(())
}
