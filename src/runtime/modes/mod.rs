//! Mode routing
//!
//! - Server mode (HTTP server), the default
//! - CLI mode (one-shot maintenance commands)

#[cfg(feature = "server")]
pub mod server;

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(feature = "server")]
pub use server::run_server;

#[cfg(feature = "cli")]
pub use cli::run_cli;

use crate::cli::Commands;

/// Mode detection result
#[derive(Debug, PartialEq)]
pub enum Mode {
    #[cfg(feature = "server")]
    Server,
    #[cfg(feature = "cli")]
    Cli,
    Unknown,
}

/// 没有子命令或 `serve` 时进入服务器模式，其余子命令走 CLI
pub fn detect_mode(command: Option<&Commands>) -> Mode {
    match command {
        #[cfg(feature = "server")]
        None | Some(Commands::Serve) => Mode::Server,
        #[cfg(feature = "cli")]
        Some(_) => Mode::Cli,
        #[allow(unreachable_patterns)]
        _ => Mode::Unknown,
    }
}
