//! Cache sync command

use std::sync::Arc;

use colored::Colorize;

use crate::cache::create_snapshot_cache;
use crate::config::get_config;
use crate::interfaces::cli::CliError;
use crate::services::CacheSyncService;
use crate::storage::CampStorage;

pub async fn sync_cache(storage: Arc<CampStorage>, rebuild: bool) -> Result<(), CliError> {
    let config = get_config();
    let cache = create_snapshot_cache(&config.cache).await?;
    if !cache.is_enabled() {
        return Err(CliError::CommandError(
            "Snapshot cache is disabled (cache.backend = \"none\")".to_string(),
        ));
    }

    let service = CacheSyncService::new(storage, cache, config.cache.retry_count);
    let status = if rebuild {
        println!("{}", "Rebuilding cache from the database...".yellow());
        service.rebuild().await?
    } else {
        service.run_once().await?
    };

    println!(
        "{} {} ({} ms)",
        "Cache synchronized:".green().bold(),
        status.backend.cyan(),
        status.duration_ms
    );
    for report in &status.collections {
        let state = if report.skipped {
            "up to date".dimmed().to_string()
        } else {
            format!("{} written, {} removed", report.written, report.removed)
        };
        println!(
            "  {:<12} {:>5} records  {}",
            report.collection.as_ref(),
            report.total,
            state
        );
    }
    Ok(())
}
