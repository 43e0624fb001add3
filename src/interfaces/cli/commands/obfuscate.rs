//! Address obfuscation command

use colored::Colorize;

use crate::interfaces::cli::CliError;
use crate::services::{CampService, obfuscate_campers};

pub async fn run_obfuscate(service: &CampService, seed: u64, dry_run: bool) -> Result<(), CliError> {
    let report = obfuscate_campers(service, seed, dry_run).await?;

    if dry_run {
        println!(
            "{} {} of {} campers would change (seed {})",
            "Dry run:".yellow().bold(),
            report.changed,
            report.examined,
            seed
        );
    } else {
        println!(
            "{} {} of {} campers updated (seed {})",
            "Obfuscated:".green().bold(),
            report.changed,
            report.examined,
            seed
        );
    }
    Ok(())
}
