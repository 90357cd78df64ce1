//! Project initialization: `tracker init`.

use anyhow::{Context, Result};

use issue_tracker::config::{TrackerConfig, TrackerToml};

use super::open_db;

pub fn cmd_init(config: &TrackerConfig) -> Result<()> {
    std::fs::create_dir_all(&config.tracker_dir).with_context(|| {
        format!(
            "Failed to create tracker directory {}",
            config.tracker_dir.display()
        )
    })?;

    let config_path = config.config_file();
    if config_path.exists() {
        println!("Keeping existing {}", config_path.display());
    } else {
        TrackerToml::default().save(&config_path)?;
        println!("Wrote {}", config_path.display());
    }

    open_db(config)?;
    println!("Database initialized at {}", config.db_path().display());
    println!();
    println!(
        "Next: create an account with {}",
        console::style("tracker user create <name> --superuser").bold()
    );
    Ok(())
}
