use std::sync::Arc;

use clap::Subcommand;
use dosewatch_core::{Config, ReminderConfig, ReminderScheduler, SqliteStore, TwilioGateway};

#[derive(Subcommand)]
pub enum RemindAction {
    /// Place the reminder call for a dose and run the escalation cycle
    Trigger {
        dose_id: i64,
        /// Exit after the initial call instead of waiting out the grace
        /// period. The deferred evaluation dies with the process.
        #[arg(long)]
        no_wait: bool,
    },
}

pub fn run(action: RemindAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        RemindAction::Trigger { dose_id, no_wait } => trigger(dose_id, no_wait),
    }
}

fn trigger(dose_id: i64, no_wait: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();
    let store = Arc::new(SqliteStore::open()?);
    let gateway = Arc::new(TwilioGateway::from_config(&config.twilio)?);
    let scheduler = ReminderScheduler::new(store, gateway, ReminderConfig::from(&config));

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let triggered = scheduler.trigger_reminder(dose_id).await?;
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "cycle_id": triggered.cycle_id,
                "call_id": triggered.call_id,
            }))?
        );

        if no_wait {
            log::warn!("exiting with the evaluation still pending (--no-wait)");
        } else {
            scheduler.wait_for_cycle(dose_id).await;
        }
        Ok(())
    })
}
