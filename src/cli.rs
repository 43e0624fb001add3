//! Command-line interface definitions using clap
//!
//! 不带子命令时启动 HTTP 服务。

use clap::{Parser, Subcommand, ValueEnum};

/// camptrack - camp management backend
#[derive(Parser, Debug)]
#[command(name = "camptrack")]
#[command(version)]
#[command(about = "Campers, volunteers and care data over GraphQL", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file (default: config.toml)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Run one cache reconciliation pass against the configured backend
    SyncCache {
        /// Clear every collection first and rebuild from the database
        #[arg(long)]
        rebuild: bool,
    },

    /// Scramble camper addresses and guardian phone numbers for demo data
    Obfuscate {
        /// Seed for the deterministic scrambling
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Show what would change without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Export campers, volunteers and assignments
    Export {
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,

        /// Output file path (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<String>,
    },

    /// Import a JSON snapshot or a CSV camper roster (chosen by file extension)
    Import {
        /// Input file path
        file_path: String,

        /// Delete records that are not present in the file
        #[arg(long)]
        prune: bool,

        /// Ignore ids in the file and create every record anew
        #[arg(long)]
        fresh: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate an example configuration file
    Generate {
        /// Output path (default: print to stdout)
        #[arg(long, short = 'o')]
        output: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    /// Full snapshot (campers with care data, volunteers, assignments)
    Json,
    /// Camper roster only
    Csv,
}
