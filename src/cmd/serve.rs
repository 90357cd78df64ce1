//! Web server command: `tracker serve`.

use anyhow::Result;
use std::path::PathBuf;

use issue_tracker::config::TrackerConfig;
use issue_tracker::tracker::server::{ServerConfig, start_server};

/// CLI flags win over the config file and `TRACKER_*` variables.
pub async fn cmd_serve(
    config: &TrackerConfig,
    host: Option<String>,
    port: Option<u16>,
    db_path: Option<PathBuf>,
    dev: bool,
    open: bool,
) -> Result<()> {
    for warning in config.toml.validate() {
        tracing::warn!("{}", warning);
    }

    let server = &config.toml.server;
    start_server(ServerConfig {
        host: host.unwrap_or_else(|| server.host.clone()),
        port: port.unwrap_or(server.port),
        db_path: db_path.unwrap_or_else(|| config.db_path()),
        dev_mode: dev || server.dev_mode,
        open_browser: open,
    })
    .await
}
