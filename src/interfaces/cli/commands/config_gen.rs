//! Generate config command

use colored::Colorize;

use crate::config::StaticConfig;
use crate::interfaces::cli::CliError;

/// 输出示例配置；给出路径时写入文件
pub fn generate_config(output: Option<String>, force: bool) -> Result<(), CliError> {
    let Some(path) = output else {
        println!("{}", StaticConfig::generate_sample_config());
        return Ok(());
    };

    if std::path::Path::new(&path).exists() && !force {
        return Err(CliError::CommandError(format!(
            "{} already exists, use --force to overwrite",
            path
        )));
    }

    println!(
        "{} {}",
        "Generating configuration file...".yellow(),
        path.blue()
    );

    StaticConfig::default().save_to_file(&path).map_err(|e| {
        CliError::CommandError(format!("Unable to write configuration file: {}", e))
    })?;

    println!(
        "  {} {}",
        "Configuration file generated successfully".green(),
        path.blue()
    );
    Ok(())
}
