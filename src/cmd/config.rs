//! Configuration view and validation commands: `tracker config`.

use anyhow::Result;

use issue_tracker::config::{TrackerConfig, TrackerToml};

use crate::ConfigCommands;

pub fn cmd_config(config: &TrackerConfig, command: Option<ConfigCommands>) -> Result<()> {
    let config_path = config.config_file();

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Tracker Configuration");
            println!("=====================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No tracker.toml found at {}", config_path.display());
                println!("Using default configuration.");
            }
            println!();

            // Effective values: file, then TRACKER_* overrides
            let toml = &config.toml;
            println!("[server]");
            println!("  host = \"{}\"", toml.server.host);
            println!("  port = {}", toml.server.port);
            println!("  dev_mode = {}", toml.server.dev_mode);
            println!();
            println!("[database]");
            println!("  path = \"{}\"", config.db_path().display());
            println!();
            println!("[logging]");
            println!("  level = \"{}\"", toml.logging.level);
            println!("  format = \"{}\"", toml.logging.format);
            if let Some(file) = config.log_file() {
                println!("  file = \"{}\"", file.display());
            }
            println!();
        }
        Some(ConfigCommands::Validate) => {
            let warnings = config.toml.validate();
            if warnings.is_empty() {
                println!("{}", console::style("Configuration is valid.").green());
            } else {
                for warning in &warnings {
                    println!("{} {}", console::style("warning:").yellow().bold(), warning);
                }
            }
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                anyhow::bail!("{} already exists", config_path.display());
            }
            std::fs::create_dir_all(&config.tracker_dir)?;
            TrackerToml::default().save(&config_path)?;
            println!("Created {}", config_path.display());
        }
    }
    Ok(())
}
