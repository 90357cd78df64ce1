//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module     | Commands handled        |
//! |------------|-------------------------|
//! | `serve`    | `Serve`                 |
//! | `init`     | `Init`                  |
//! | `user`     | `User create/list`      |
//! | `category` | `Category create/list`  |
//! | `stats`    | `Stats`                 |
//! | `config`   | `Config`                |

use anyhow::{Context, Result};

use issue_tracker::config::TrackerConfig;
use issue_tracker::tracker::db::TrackerDb;

pub mod category;
pub mod config;
pub mod init;
pub mod serve;
pub mod stats;
pub mod user;

pub use category::cmd_category;
pub use config::cmd_config;
pub use init::cmd_init;
pub use serve::cmd_serve;
pub use stats::cmd_stats;
pub use user::cmd_user;

/// Open the configured database, creating its directory when needed.
pub fn open_db(config: &TrackerConfig) -> Result<TrackerDb> {
    let db_path = config.db_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }
    TrackerDb::open(&db_path)
}
