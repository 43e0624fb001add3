//! Export / import commands

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use colored::Colorize;

use crate::cli::ExportFormat;
use crate::interfaces::cli::CliError;
use crate::services::reconcile::SyncReport;
use crate::services::transfer::{
    export_snapshot, import_snapshot, read_roster_csv, read_snapshot_file, write_roster_csv,
    write_snapshot_json,
};
use crate::services::{CampService, ImportMode};
use crate::storage::CamperInput;

fn open_output(output: Option<&str>) -> Result<Box<dyn Write>, CliError> {
    match output {
        Some(path) => {
            let file = File::create(path)
                .map_err(|e| CliError::CommandError(format!("Failed to create {}: {}", path, e)))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(std::io::stdout().lock())),
    }
}

pub async fn export_data(
    service: &CampService,
    format: ExportFormat,
    output: Option<String>,
) -> Result<(), CliError> {
    let summary = match format {
        ExportFormat::Json => {
            let snapshot = export_snapshot(service).await?;
            let mut writer = open_output(output.as_deref())?;
            write_snapshot_json(&snapshot, &mut writer)?;
            writeln!(writer).and_then(|_| writer.flush()).map_err(|e| {
                CliError::CommandError(format!("Failed to write export: {}", e))
            })?;
            format!(
                "{} campers, {} volunteers, {} assignments",
                snapshot.campers.len(),
                snapshot.volunteers.len(),
                snapshot.assignments.len()
            )
        }
        ExportFormat::Csv => {
            let records = service.storage().list_campers_with_care().await?;
            let mut writer = open_output(output.as_deref())?;
            write_roster_csv(&records, &mut writer)?;
            format!("{} campers", records.len())
        }
    };

    // 输出到 stdout 时不打印摘要，避免混进数据
    if let Some(path) = output {
        println!(
            "{} {} to {}",
            "Exported".green().bold(),
            summary,
            path.blue()
        );
    }
    Ok(())
}

fn print_report(label: &str, report: &SyncReport) {
    println!(
        "  {:<11} {} created, {} updated, {} unchanged, {} deleted",
        label,
        report.created.len().to_string().green(),
        report.updated.len().to_string().yellow(),
        report.unchanged.len(),
        report.deleted.len().to_string().red()
    );
    if !report.missing.is_empty() {
        println!(
            "  {} ids not found and skipped: {:?}",
            "warning:".yellow(),
            report.missing
        );
    }
}

pub async fn import_data(
    service: &CampService,
    file_path: String,
    prune: bool,
    fresh: bool,
) -> Result<(), CliError> {
    let is_csv = Path::new(&file_path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    println!("{} {}", "Importing".yellow(), file_path.blue());

    if is_csv {
        let file = File::open(&file_path)
            .map_err(|e| CliError::CommandError(format!("Failed to open {}: {}", file_path, e)))?;
        let mut campers = read_roster_csv(BufReader::new(file))?;
        if fresh {
            campers = campers
                .into_iter()
                .map(|c| CamperInput { id: None, ..c })
                .collect();
        }
        let report = service.update_all_campers(campers, prune).await?;
        print_report("campers", &report);
    } else {
        let snapshot = read_snapshot_file(&file_path)?;
        let mode = if fresh {
            ImportMode::Fresh
        } else {
            ImportMode::Merge
        };
        let report = import_snapshot(service, snapshot, mode, prune).await?;
        print_report("campers", &report.campers);
        print_report("volunteers", &report.volunteers);
        println!(
            "  {:<11} {} applied, {} skipped",
            "assignments", report.assignments_applied, report.assignments_skipped
        );
    }

    println!("{}", "Import completed".green().bold());
    Ok(())
}
