//! Integration tests for the `tracker` binary
//!
//! These drive the CLI against a temporary project directory.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to create a tracker Command rooted in `dir`
fn tracker(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("tracker");
    cmd.current_dir(dir.path())
        .env_remove("TRACKER_PROJECT_DIR")
        .env_remove("TRACKER_HOST")
        .env_remove("TRACKER_PORT")
        .env_remove("TRACKER_DB_PATH")
        .env_remove("TRACKER_LOG")
        .env_remove("TRACKER_LOG_FORMAT");
    cmd
}

fn init_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    tracker(&dir).arg("init").assert().success();
    dir
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_tracker_help() {
        let dir = TempDir::new().unwrap();
        tracker(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("serve"))
            .stdout(predicate::str::contains("user"));
    }

    #[test]
    fn test_tracker_version() {
        let dir = TempDir::new().unwrap();
        tracker(&dir).arg("--version").assert().success();
    }

    #[test]
    fn test_init_creates_structure() {
        let dir = TempDir::new().unwrap();

        tracker(&dir)
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("Database initialized"));

        assert!(dir.path().join(".tracker").is_dir());
        assert!(dir.path().join(".tracker/tracker.toml").exists());
        assert!(dir.path().join(".tracker/tracker.db").exists());
    }

    #[test]
    fn test_init_is_idempotent() {
        let dir = init_project();
        fs::write(
            dir.path().join(".tracker/tracker.toml"),
            "[server]\nport = 9123\n",
        )
        .unwrap();

        tracker(&dir)
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("Keeping existing"));

        let content = fs::read_to_string(dir.path().join(".tracker/tracker.toml")).unwrap();
        assert!(content.contains("9123"));
    }

    #[test]
    fn test_project_dir_flag() {
        let cwd = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();

        tracker(&cwd)
            .arg("--project-dir")
            .arg(project.path())
            .arg("init")
            .assert()
            .success();

        assert!(project.path().join(".tracker/tracker.db").exists());
        assert!(!cwd.path().join(".tracker").exists());
    }
}

// =============================================================================
// Users and Categories
// =============================================================================

mod accounts {
    use super::*;

    #[test]
    fn test_user_create_and_list() {
        let dir = init_project();

        tracker(&dir)
            .args(["user", "create", "alice", "--password", "pw"])
            .args(["--first-name", "Alice", "--last-name", "Liddell", "--superuser"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created user"))
            .stdout(predicate::str::contains("superuser"));

        tracker(&dir)
            .args(["user", "create", "bob", "--password", "pw"])
            .assert()
            .success();

        tracker(&dir)
            .args(["user", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("alice"))
            .stdout(predicate::str::contains("Alice Liddell"))
            .stdout(predicate::str::contains("bob"));
    }

    #[test]
    fn test_duplicate_username_fails() {
        let dir = init_project();

        tracker(&dir)
            .args(["user", "create", "alice", "--password", "pw"])
            .assert()
            .success();

        tracker(&dir)
            .args(["user", "create", "alice", "--password", "other"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("alice"));
    }

    #[test]
    fn test_empty_password_is_rejected() {
        let dir = init_project();

        tracker(&dir)
            .args(["user", "create", "carol", "--password", ""])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Password must not be empty"));
    }

    #[test]
    fn test_list_without_users() {
        let dir = init_project();

        tracker(&dir)
            .args(["user", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No users yet."));
    }

    #[test]
    fn test_category_create_and_list() {
        let dir = init_project();

        tracker(&dir)
            .args(["category", "create", "Backend"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created category Backend"));

        tracker(&dir)
            .args(["category", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Backend"));
    }

    #[test]
    fn test_blank_category_is_rejected() {
        let dir = init_project();

        tracker(&dir)
            .args(["category", "create", "   "])
            .assert()
            .failure();
    }
}

// =============================================================================
// Statistics
// =============================================================================

mod stats {
    use super::*;

    #[test]
    fn test_stats_on_empty_database() {
        let dir = init_project();

        tracker(&dir)
            .arg("stats")
            .assert()
            .success()
            .stdout(predicate::str::contains("Issues"))
            .stdout(predicate::str::contains("No completed issues yet."));
    }
}

// =============================================================================
// Configuration
// =============================================================================

mod config {
    use super::*;

    #[test]
    fn test_config_show_defaults() {
        let dir = TempDir::new().unwrap();

        tracker(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No tracker.toml found"))
            .stdout(predicate::str::contains("port = 8000"));
    }

    #[test]
    fn test_config_show_reads_file_and_env() {
        let dir = init_project();
        fs::write(
            dir.path().join(".tracker/tracker.toml"),
            "[server]\nport = 9000\n\n[logging]\nformat = \"json\"\n",
        )
        .unwrap();

        tracker(&dir)
            .env("TRACKER_HOST", "0.0.0.0")
            .arg("config")
            .assert()
            .success()
            .stdout(predicate::str::contains("port = 9000"))
            .stdout(predicate::str::contains("host = \"0.0.0.0\""))
            .stdout(predicate::str::contains("format = \"json\""));
    }

    #[test]
    fn test_config_init_refuses_overwrite() {
        let dir = TempDir::new().unwrap();

        tracker(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created"));

        tracker(&dir)
            .args(["config", "init"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("already exists"));
    }

    #[test]
    fn test_config_validate_warns() {
        let dir = init_project();
        fs::write(dir.path().join(".tracker/tracker.toml"), "[server]\nport = 0\n").unwrap();

        tracker(&dir)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("warning:"));
    }

    #[test]
    fn test_broken_config_fails() {
        let dir = init_project();
        fs::write(dir.path().join(".tracker/tracker.toml"), "[server\n").unwrap();

        tracker(&dir)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("tracker.toml"));
    }

    #[test]
    fn test_config_validate_rejects_broken_file() {
        let dir = init_project();
        fs::write(dir.path().join(".tracker/tracker.toml"), "[logging]\nformat = \"xml\"\n").unwrap();

        tracker(&dir)
            .args(["config", "validate"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to parse tracker.toml"));
    }

    #[test]
    fn test_bad_env_port_fails() {
        let dir = TempDir::new().unwrap();

        tracker(&dir)
            .env("TRACKER_PORT", "eighty")
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("TRACKER_PORT"));
    }
}
