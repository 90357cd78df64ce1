//! Configuration for the tracker, read from `.tracker/tracker.toml`.
//!
//! Every key is optional. Values are layered file → environment → CLI:
//! the file is parsed first, `TRACKER_*` variables (including ones loaded
//! from a `.env` file) override it, and command-line flags win over both.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8000
//! dev_mode = false
//!
//! [database]
//! path = ".tracker/tracker.db"
//!
//! [logging]
//! level = "info"
//! format = "text"      # or "json"
//! file = ".tracker/logs/tracker.log"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::TrackerError;

pub const TRACKER_DIR: &str = ".tracker";
pub const CONFIG_FILE: &str = "tracker.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!("Invalid log format '{}'. Valid values: text, json", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    /// Adds permissive CORS for front-end work against another origin.
    pub dev_mode: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            dev_mode: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// Relative paths are resolved against the project directory.
    pub path: PathBuf,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from(TRACKER_DIR).join("tracker.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// An `EnvFilter` directive such as `info` or `issue_tracker=debug,tower_http=info`.
    pub level: String,
    pub format: LogFormat,
    /// Also write logs to this file, rotated daily.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            file: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerToml {
    pub server: ServerSection,
    pub database: DatabaseSection,
    pub logging: LoggingSection,
}

impl TrackerToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse tracker.toml")
    }

    /// Load `tracker.toml` from `tracker_dir`, or defaults when it is absent.
    pub fn load_or_default(tracker_dir: &Path) -> Result<Self> {
        let config_path = tracker_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize tracker.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Override file values with `TRACKER_*` environment variables.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("TRACKER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("TRACKER_PORT") {
            self.server.port = port.parse().map_err(|_| {
                TrackerError::Config(format!("TRACKER_PORT is not a valid port: {}", port))
            })?;
        }
        if let Some(path) = lookup("TRACKER_DB_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(level) = lookup("TRACKER_LOG") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("TRACKER_LOG_FORMAT") {
            self.logging.format = format
                .parse()
                .map_err(|e: anyhow::Error| TrackerError::Config(e.to_string()))?;
        }
        Ok(())
    }

    /// Return warnings for settings that are accepted but probably wrong.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.server.port == 0 {
            warnings.push("server.port is 0; an ephemeral port will be picked".to_string());
        }
        if self.server.dev_mode && self.server.host != "127.0.0.1" && self.server.host != "localhost" {
            warnings.push(format!(
                "server.dev_mode enables permissive CORS while listening on {}",
                self.server.host
            ));
        }
        if tracing_subscriber::EnvFilter::try_new(&self.logging.level).is_err() {
            warnings.push(format!(
                "logging.level '{}' is not a valid filter; falling back to info",
                self.logging.level
            ));
        }
        warnings
    }
}

/// Resolved configuration for one project directory.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub project_dir: PathBuf,
    pub tracker_dir: PathBuf,
    pub toml: TrackerToml,
}

impl TrackerConfig {
    /// Load the file and apply environment overrides.
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        let tracker_dir = project_dir.join(TRACKER_DIR);
        let mut toml = TrackerToml::load_or_default(&tracker_dir)?;
        toml.apply_env()?;
        Ok(Self {
            project_dir,
            tracker_dir,
            toml,
        })
    }

    pub fn config_file(&self) -> PathBuf {
        self.tracker_dir.join(CONFIG_FILE)
    }

    pub fn db_path(&self) -> PathBuf {
        self.resolve(&self.toml.database.path)
    }

    pub fn log_file(&self) -> Option<PathBuf> {
        self.toml.logging.file.as_deref().map(|p| self.resolve(p))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_dir.join(path)
        }
    }
}
