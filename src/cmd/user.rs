//! User account commands: `tracker user`.

use anyhow::{Context, Result};

use issue_tracker::config::TrackerConfig;
use issue_tracker::tracker::models::NewUser;

use crate::UserCommands;
use super::open_db;

pub fn cmd_user(config: &TrackerConfig, command: UserCommands) -> Result<()> {
    let db = open_db(config)?;

    match command {
        UserCommands::Create {
            username,
            password,
            first_name,
            last_name,
            superuser,
        } => {
            let password = match password {
                Some(p) => p,
                None => dialoguer::Password::new()
                    .with_prompt(format!("Password for {}", username))
                    .with_confirmation("Repeat password", "Passwords do not match")
                    .interact()
                    .context("Failed to read password")?,
            };
            if password.is_empty() {
                anyhow::bail!("Password must not be empty");
            }

            let user = db.create_user(&NewUser {
                username,
                password,
                first_name,
                last_name,
                is_superuser: superuser,
            })?;
            tracing::info!(user_id = user.id, username = %user.username, superuser, "user created");
            println!(
                "Created user {} (id {}){}",
                console::style(&user.username).bold(),
                user.id,
                if user.is_superuser { ", superuser" } else { "" }
            );
        }
        UserCommands::List => {
            let users = db.list_users()?;
            if users.is_empty() {
                println!("No users yet.");
                return Ok(());
            }
            for user in users {
                let role = if user.is_superuser {
                    console::style("superuser").yellow().to_string()
                } else {
                    String::new()
                };
                println!(
                    "{:>4}  {:<20} {:<30} {}",
                    user.id,
                    user.username,
                    user.full_name(),
                    role
                );
            }
        }
    }
    Ok(())
}
