use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use issue_tracker::config::TrackerConfig;
use issue_tracker::logging;

mod cmd;

#[derive(Parser)]
#[command(name = "tracker")]
#[command(version, about = "Issue tracker - create issues, assign solvers, track completion times")]
pub struct Cli {
    /// Log debug output from the tracker itself
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding `.tracker/` (defaults to the current directory)
    #[arg(long, global = true, env = "TRACKER_PROJECT_DIR")]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the web application
    Serve {
        /// Interface to bind (overrides config and TRACKER_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to serve on (overrides config and TRACKER_PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Database path (overrides config and TRACKER_DB_PATH)
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Enable dev mode (permissive CORS)
        #[arg(long)]
        dev: bool,

        /// Open a browser once the server is listening
        #[arg(long)]
        open: bool,
    },
    /// Create the `.tracker` directory, a default config and the database
    Init,
    /// Manage user accounts
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Manage issue categories
    Category {
        #[command(subcommand)]
        command: CategoryCommands,
    },
    /// Show completion-time statistics
    Stats,
    /// View, validate or initialize configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum UserCommands {
    /// Create a user (prompts for the password when not given)
    Create {
        username: String,
        #[arg(long)]
        password: Option<String>,
        #[arg(long, default_value = "")]
        first_name: String,
        #[arg(long, default_value = "")]
        last_name: String,
        /// Allow every action and the search endpoints
        #[arg(long)]
        superuser: bool,
    },
    /// List all users
    List,
}

#[derive(Subcommand, Clone)]
pub enum CategoryCommands {
    /// Create a category
    Create { name: String },
    /// List all categories
    List,
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Write a default tracker.toml
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let config = TrackerConfig::new(project_dir)?;
    let _log_guard = logging::init(
        &config.toml.logging.level,
        config.toml.logging.format,
        config.log_file().as_deref(),
        cli.verbose,
    )?;

    match cli.command {
        Commands::Serve {
            host,
            port,
            db_path,
            dev,
            open,
        } => cmd::cmd_serve(&config, host, port, db_path, dev, open).await?,
        Commands::Init => cmd::cmd_init(&config)?,
        Commands::User { command } => cmd::cmd_user(&config, command)?,
        Commands::Category { command } => cmd::cmd_category(&config, command)?,
        Commands::Stats => cmd::cmd_stats(&config)?,
        Commands::Config { command } => cmd::cmd_config(&config, command)?,
    }

    Ok(())
}
