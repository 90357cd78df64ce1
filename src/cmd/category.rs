//! Issue category commands: `tracker category`.

use anyhow::Result;

use issue_tracker::config::TrackerConfig;
use issue_tracker::tracker::models::NAME_MAX_LEN;

use crate::CategoryCommands;
use super::open_db;

pub fn cmd_category(config: &TrackerConfig, command: CategoryCommands) -> Result<()> {
    let db = open_db(config)?;

    match command {
        CategoryCommands::Create { name } => {
            let name = name.trim();
            if name.is_empty() || name.chars().count() > NAME_MAX_LEN {
                anyhow::bail!("Category name must be 1 to {} characters", NAME_MAX_LEN);
            }
            let category = db.create_category(name)?;
            println!("Created category {} (id {})", category.name, category.id);
        }
        CategoryCommands::List => {
            let categories = db.list_categories()?;
            if categories.is_empty() {
                println!("No categories yet.");
            }
            for category in categories {
                println!("{:>4}  {}", category.id, category.name);
            }
        }
    }
    Ok(())
}
