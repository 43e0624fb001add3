//! CLI interface module
//!
//! 每个子命令直接连数据库执行，不需要服务进程在运行。

pub mod commands;

use std::fmt;
use std::sync::Arc;

use crate::cli::{Commands, ConfigCommands};
use crate::config::get_config;
use crate::services::CampService;
use crate::storage::StorageFactory;
use commands::{export_data, generate_config, import_data, run_obfuscate, sync_cache};

#[derive(Debug)]
pub enum CliError {
    StorageError(String),
    ParseError(String),
    CommandError(String),
}

impl CliError {
    /// Format as simple output
    pub fn format_simple(&self) -> String {
        match self {
            CliError::StorageError(msg) => format!("Storage error: {}", msg),
            CliError::ParseError(msg) => format!("Parse error: {}", msg),
            CliError::CommandError(msg) => format!("Command error: {}", msg),
        }
    }

    /// Format as colored output
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        match self {
            CliError::StorageError(msg) => {
                format!("{} {}", "Storage error:".red().bold(), msg.white())
            }
            CliError::ParseError(msg) => {
                format!("{} {}", "Parse error:".yellow().bold(), msg.white())
            }
            CliError::CommandError(msg) => {
                format!("{} {}", "Command error:".red().bold(), msg.white())
            }
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for CliError {}

impl From<crate::errors::CampError> for CliError {
    fn from(err: crate::errors::CampError) -> Self {
        match err {
            crate::errors::CampError::Validation(msg)
            | crate::errors::CampError::Serialization(msg) => CliError::ParseError(msg),
            other => CliError::StorageError(other.to_string()),
        }
    }
}

async fn open_service() -> Result<Arc<CampService>, CliError> {
    let config = get_config();
    let storage = StorageFactory::create()
        .await
        .map_err(|e| CliError::StorageError(e.to_string()))?;
    Ok(Arc::new(CampService::new(storage, config.sync.clone())))
}

/// Run a CLI command from clap-parsed input
pub async fn run_cli_command(cmd: Commands) -> Result<(), CliError> {
    // config generate 不需要数据库
    if let Commands::Config {
        action: ConfigCommands::Generate { output, force },
    } = cmd
    {
        return generate_config(output, force);
    }

    let service = open_service().await?;

    let result = match cmd {
        Commands::SyncCache { rebuild } => sync_cache(service.storage().clone(), rebuild).await,
        Commands::Obfuscate { seed, dry_run } => run_obfuscate(&service, seed, dry_run).await,
        Commands::Export { format, output } => export_data(&service, format, output).await,
        Commands::Import {
            file_path,
            prune,
            fresh,
        } => import_data(&service, file_path, prune, fresh).await,
        Commands::Serve => Err(CliError::CommandError(
            "serve is handled by the server runtime".to_string(),
        )),
        Commands::Config { .. } => Ok(()),
    };

    if let Err(e) = service.storage().close().await {
        tracing::warn!("Failed to close database: {}", e);
    }
    result
}
