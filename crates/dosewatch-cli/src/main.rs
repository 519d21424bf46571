use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "dosewatch", version, about = "DoseWatch CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Caregiver and individual roster
    Roster {
        #[command(subcommand)]
        action: commands::roster::RosterAction,
    },
    /// Dose schedule management and adherence
    Med {
        #[command(subcommand)]
        action: commands::med::MedAction,
    },
    /// Reminder triggering
    Remind {
        #[command(subcommand)]
        action: commands::remind::RemindAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Roster { action } => commands::roster::run(action),
        Commands::Med { action } => commands::med::run(action),
        Commands::Remind { action } => commands::remind::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
