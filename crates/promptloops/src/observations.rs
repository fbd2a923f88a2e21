use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use promptloops_db::Database;

#[derive(Subcommand, Debug)]
pub enum ObservationsAction {
    /// List stored observations, oldest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete every stored observation
    Clear,
}

pub fn handle_observations_command(action: ObservationsAction, db: &Database) -> Result<()> {
    let observations = db.observations();

    match action {
        ObservationsAction::List { json } => {
            let records = observations
                .list()
                .context("Failed to read observations")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
                return Ok(());
            }

            if records.is_empty() {
                eprintln!("No observations recorded yet.");
                return Ok(());
            }

            for (i, record) in records.iter().enumerate() {
                println!(
                    "{:>3}  {}  {}",
                    (i + 1).to_string().dimmed(),
                    record.created_at.format("%Y-%m-%d %H:%M").to_string().dimmed(),
                    record.text
                );
            }
            eprintln!();
            eprintln!("{} observation(s)", records.len().to_string().bold());
        }
        ObservationsAction::Clear => {
            let removed = observations
                .clear()
                .context("Failed to clear observations")?;
            eprintln!("{} Removed {} observation(s)", "->".bright_green(), removed);
        }
    }

    Ok(())
}
