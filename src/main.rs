use anyhow::Result;
use clap::Parser;

use camptrack::cli::Cli;
use camptrack::config::{get_config, init_config_from};
use camptrack::runtime::modes::{self, Mode};
use camptrack::system::init_logging;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_config_from(cli.config.as_deref());
    let config = get_config();

    // guard 必须活到 main 结束
    let log_guard = init_logging(&config.logging)?;

    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|e| anyhow::anyhow!("Failed to install rustls crypto provider: {:?}", e))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match modes::detect_mode(cli.command.as_ref()) {
        #[cfg(feature = "server")]
        Mode::Server => runtime.block_on(modes::run_server()),
        #[cfg(feature = "cli")]
        Mode::Cli => {
            let Some(command) = cli.command else {
                return Ok(());
            };
            if let Err(e) = runtime.block_on(modes::run_cli(command)) {
                eprintln!("{}", e.format_colored());
                drop(log_guard);
                std::process::exit(1);
            }
            Ok(())
        }
        Mode::Unknown => {
            eprintln!("No execution mode is enabled in this build");
            std::process::exit(1);
        }
    }
}
