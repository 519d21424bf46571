use clap::Subcommand;
use dosewatch_core::SqliteStore;

#[derive(Subcommand)]
pub enum RosterAction {
    /// Register a caregiver
    CaregiverAdd {
        name: String,
        email: String,
        /// Contact phone number in E.164 form, e.g. +15551234567
        phone: String,
    },
    /// List registered caregivers
    Caregivers,
    /// Add a care recipient under a caregiver
    IndividualAdd {
        name: String,
        caregiver_id: i64,
    },
}

pub fn run(action: RosterAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteStore::open()?;
    match action {
        RosterAction::CaregiverAdd { name, email, phone } => {
            let id = store.add_caregiver(&name, &email, &phone)?;
            println!("caregiver registered: {id}");
        }
        RosterAction::Caregivers => {
            let json = serde_json::to_string_pretty(&store.caregivers()?)?;
            println!("{json}");
        }
        RosterAction::IndividualAdd { name, caregiver_id } => {
            let id = store.add_individual(&name, caregiver_id)?;
            println!("individual added: {id}");
        }
    }
    Ok(())
}
