use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use super::auth;
use super::lifecycle;
use super::models::*;
use crate::errors::TrackerError;

/// Async-safe handle to the tracker database.
///
/// Wraps `TrackerDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, so synchronous SQLite I/O
/// never ties up async worker threads.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<TrackerDb>>,
}

impl DbHandle {
    pub fn new(db: TrackerDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&TrackerDb) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db.lock().map_err(|_| TrackerError::LockPoisoned)?;
            f(&guard)
        })
        .await
        .context("DB task panicked")?
    }

    /// Acquire the database mutex synchronously. Only for startup and tests.
    pub fn lock_sync(&self) -> Result<std::sync::MutexGuard<'_, TrackerDb>> {
        self.inner
            .lock()
            .map_err(|_| TrackerError::LockPoisoned.into())
    }
}

pub struct TrackerDb {
    conn: Connection,
}

const USER_COLUMNS: &str = "id, username, first_name, last_name, is_superuser, created_at";

const ISSUE_SELECT: &str = "
    SELECT i.id, i.name, i.description, i.state, i.completed_in, i.created_at, i.assigned_at,
           c.id, c.username, c.first_name, c.last_name,
           s.id, s.username, s.first_name, s.last_name,
           cat.id, cat.name
    FROM issues i
    JOIN users c ON c.id = i.created_by
    LEFT JOIN users s ON s.id = i.solver_id
    LEFT JOIN issue_categories cat ON cat.id = i.category_id";

impl TrackerDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite database at {}", path.display()))?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        self.run_migrations().context("Failed to run migrations")?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    username TEXT NOT NULL UNIQUE,
                    first_name TEXT NOT NULL DEFAULT '',
                    last_name TEXT NOT NULL DEFAULT '',
                    password_hash TEXT NOT NULL,
                    is_superuser INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS sessions (
                    token TEXT PRIMARY KEY,
                    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS issue_categories (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS issues (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    description TEXT NOT NULL,
                    created_by INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    solver_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
                    category_id INTEGER REFERENCES issue_categories(id) ON DELETE SET NULL,
                    state TEXT NOT NULL DEFAULT 'created',
                    completed_in INTEGER,
                    created_at TEXT NOT NULL,
                    assigned_at TEXT
                );

                CREATE INDEX IF NOT EXISTS idx_issues_state ON issues(state);
                CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
                ",
            )
            .context("Failed to create tables")?;
        Ok(())
    }

    // ── Users ─────────────────────────────────────────────────────────

    pub fn create_user(&self, new: &NewUser) -> Result<User> {
        let username = new.username.trim();
        if username.is_empty() {
            return Err(TrackerError::Validation {
                field: "username".into(),
                message: "This field is required.".into(),
            }
            .into());
        }
        if self.get_user_by_username(username)?.is_some() {
            return Err(TrackerError::UsernameTaken {
                username: username.to_string(),
            }
            .into());
        }

        self.conn
            .execute(
                "INSERT INTO users (username, first_name, last_name, password_hash, is_superuser, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    username,
                    new.first_name,
                    new.last_name,
                    auth::hash_password(&new.password),
                    new.is_superuser,
                    Utc::now().to_rfc3339(),
                ],
            )
            .context("Failed to insert user")?;
        let id = self.conn.last_insert_rowid();
        self.get_user(id)?.context("User not found after insert")
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
        let row = self
            .conn
            .query_row(&sql, params![id], UserRow::from_row)
            .optional()
            .context("Failed to query user")?;
        row.map(UserRow::into_user).transpose()
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS);
        let row = self
            .conn
            .query_row(&sql, params![username], UserRow::from_row)
            .optional()
            .context("Failed to query user by username")?;
        row.map(UserRow::into_user).transpose()
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        let sql = format!("SELECT {} FROM users ORDER BY username", USER_COLUMNS);
        self.query_users(&sql, params![])
    }

    /// Case-insensitive substring match over username, first and last name.
    ///
    /// Filtered here rather than with `LIKE`, which only folds ASCII.
    pub fn search_users(&self, query: &str) -> Result<Vec<User>> {
        let needle = query.to_lowercase();
        let users = self.list_users()?;
        Ok(users
            .into_iter()
            .filter(|u| {
                [&u.username, &u.first_name, &u.last_name]
                    .iter()
                    .any(|field| contains_folded(field, &needle))
            })
            .collect())
    }

    fn query_users(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare(sql).context("Failed to prepare user query")?;
        let rows = stmt
            .query_map(args, UserRow::from_row)
            .context("Failed to query users")?;
        let mut users = Vec::new();
        for row in rows {
            users.push(row.context("Failed to read user row")?.into_user()?);
        }
        Ok(users)
    }

    pub fn set_password(&self, user_id: i64, password: &str) -> Result<()> {
        let count = self
            .conn
            .execute(
                "UPDATE users SET password_hash = ?1 WHERE id = ?2",
                params![auth::hash_password(password), user_id],
            )
            .context("Failed to update password")?;
        if count == 0 {
            return Err(TrackerError::UserNotFound { id: user_id }.into());
        }
        Ok(())
    }

    pub fn delete_user(&self, id: i64) -> Result<bool> {
        let count = self
            .conn
            .execute("DELETE FROM users WHERE id = ?1", params![id])
            .context("Failed to delete user")?;
        Ok(count > 0)
    }

    /// Check a username/password pair. Unknown users and bad passwords
    /// both yield `None`.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>> {
        let stored: Option<(i64, String)> = self
            .conn
            .query_row(
                "SELECT id, password_hash FROM users WHERE username = ?1",
                params![username],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .context("Failed to query credentials")?;
        match stored {
            Some((id, hash)) if auth::verify_password(password, &hash) => self.get_user(id),
            _ => Ok(None),
        }
    }

    // ── Sessions ──────────────────────────────────────────────────────

    pub fn create_session(&self, user_id: i64) -> Result<String> {
        self.create_session_at(user_id, Utc::now())
    }

    /// Start a session, dropping every session that has expired by `now`.
    pub fn create_session_at(&self, user_id: i64, now: DateTime<Utc>) -> Result<String> {
        let pruned = self
            .conn
            .execute(
                "DELETE FROM sessions WHERE created_at <= ?1",
                params![session_stamp(now - auth::session_ttl())],
            )
            .context("Failed to prune sessions")?;
        if pruned > 0 {
            tracing::debug!(pruned, "expired sessions removed");
        }

        let token = auth::new_session_token();
        self.conn
            .execute(
                "INSERT INTO sessions (token, user_id, created_at) VALUES (?1, ?2, ?3)",
                params![token, user_id, session_stamp(now)],
            )
            .context("Failed to insert session")?;
        Ok(token)
    }

    pub fn user_for_session(&self, token: &str) -> Result<Option<User>> {
        self.user_for_session_at(token, Utc::now())
    }

    /// Sessions older than [`auth::session_ttl`] no longer resolve.
    pub fn user_for_session_at(&self, token: &str, now: DateTime<Utc>) -> Result<Option<User>> {
        let row = self
            .conn
            .query_row(
                "SELECT u.id, u.username, u.first_name, u.last_name, u.is_superuser, u.created_at
                 FROM sessions s JOIN users u ON u.id = s.user_id
                 WHERE s.token = ?1 AND s.created_at > ?2",
                params![token, session_stamp(now - auth::session_ttl())],
                UserRow::from_row,
            )
            .optional()
            .context("Failed to query session")?;
        row.map(UserRow::into_user).transpose()
    }

    pub fn delete_session(&self, token: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM sessions WHERE token = ?1", params![token])
            .context("Failed to delete session")?;
        Ok(())
    }

    // ── Categories ────────────────────────────────────────────────────

    pub fn create_category(&self, name: &str) -> Result<IssueCategory> {
        self.conn
            .execute(
                "INSERT INTO issue_categories (name) VALUES (?1)",
                params![name],
            )
            .context("Failed to insert category")?;
        let id = self.conn.last_insert_rowid();
        self.get_category(id)?
            .context("Category not found after insert")
    }

    pub fn get_category(&self, id: i64) -> Result<Option<IssueCategory>> {
        self.conn
            .query_row(
                "SELECT id, name FROM issue_categories WHERE id = ?1",
                params![id],
                |row| {
                    Ok(IssueCategory {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()
            .context("Failed to query category")
    }

    pub fn list_categories(&self) -> Result<Vec<IssueCategory>> {
        self.query_categories("SELECT id, name FROM issue_categories ORDER BY name, id", params![])
    }

    pub fn search_categories(&self, query: &str) -> Result<Vec<IssueCategory>> {
        let needle = query.to_lowercase();
        let categories = self.list_categories()?;
        Ok(categories
            .into_iter()
            .filter(|c| contains_folded(&c.name, &needle))
            .collect())
    }

    fn query_categories(
        &self,
        sql: &str,
        args: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<IssueCategory>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .context("Failed to prepare category query")?;
        let rows = stmt
            .query_map(args, |row| {
                Ok(IssueCategory {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .context("Failed to query categories")?;
        let mut categories = Vec::new();
        for row in rows {
            categories.push(row.context("Failed to read category row")?);
        }
        Ok(categories)
    }

    pub fn save_category(&self, category: &IssueCategory) -> Result<()> {
        let count = self
            .conn
            .execute(
                "UPDATE issue_categories SET name = ?1 WHERE id = ?2",
                params![category.name, category.id],
            )
            .context("Failed to update category")?;
        if count == 0 {
            return Err(TrackerError::CategoryNotFound { id: category.id }.into());
        }
        Ok(())
    }

    pub fn delete_category(&self, id: i64) -> Result<bool> {
        let count = self
            .conn
            .execute("DELETE FROM issue_categories WHERE id = ?1", params![id])
            .context("Failed to delete category")?;
        Ok(count > 0)
    }

    // ── Issues ────────────────────────────────────────────────────────

    pub fn create_issue(&self, new: &NewIssue) -> Result<Issue> {
        self.create_issue_at(new, Utc::now())
    }

    /// Insert an issue and run the save hook on it in the same transaction.
    pub fn create_issue_at(&self, new: &NewIssue, now: DateTime<Utc>) -> Result<Issue> {
        // Safety: DbHandle's Mutex already guarantees single-threaded access.
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;

        self.conn
            .execute(
                "INSERT INTO issues (name, description, created_by, solver_id, category_id, state, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    new.name,
                    new.description,
                    new.created_by,
                    new.solver_id,
                    new.category_id,
                    IssueState::Created.as_str(),
                    now.to_rfc3339(),
                ],
            )
            .context("Failed to insert issue")?;
        let id = self.conn.last_insert_rowid();

        let mut issue = self.get_issue(id)?.context("Issue not found after insert")?;
        lifecycle::apply_save_rules(&mut issue, now);
        self.write_issue(&issue)?;

        tx.commit().context("Failed to commit issue insert")?;
        tracing::debug!(issue_id = id, state = %issue.state, "issue created");
        Ok(issue)
    }

    pub fn save_issue(&self, issue: &mut Issue) -> Result<()> {
        self.save_issue_at(issue, Utc::now())
    }

    /// Apply the save hook and persist every mutable column of `issue` in one
    /// transaction. `issue` is only updated once the write has committed.
    pub fn save_issue_at(&self, issue: &mut Issue, now: DateTime<Utc>) -> Result<()> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;

        let mut saved = issue.clone();
        lifecycle::apply_save_rules(&mut saved, now);
        if self.write_issue(&saved)? == 0 {
            return Err(TrackerError::IssueNotFound { id: saved.id }.into());
        }
        tx.commit().context("Failed to commit issue update")?;

        *issue = saved;
        tracing::debug!(issue_id = issue.id, state = %issue.state, "issue saved");
        Ok(())
    }

    fn write_issue(&self, issue: &Issue) -> Result<usize> {
        self.conn
            .execute(
                "UPDATE issues
                 SET name = ?1, description = ?2, solver_id = ?3, category_id = ?4,
                     state = ?5, completed_in = ?6, assigned_at = ?7
                 WHERE id = ?8",
                params![
                    issue.name,
                    issue.description,
                    issue.solver.as_ref().map(|s| s.id),
                    issue.category.as_ref().map(|c| c.id),
                    issue.state.as_str(),
                    issue.completed_in_secs,
                    issue.assigned_at.map(|t| t.to_rfc3339()),
                    issue.id,
                ],
            )
            .context("Failed to write issue")
    }

    pub fn get_issue(&self, id: i64) -> Result<Option<Issue>> {
        let sql = format!("{} WHERE i.id = ?1", ISSUE_SELECT);
        let row = self
            .conn
            .query_row(&sql, params![id], IssueRow::from_row)
            .optional()
            .context("Failed to query issue")?;
        row.map(IssueRow::into_issue).transpose()
    }

    pub fn list_issues(&self) -> Result<Vec<Issue>> {
        let sql = format!("{} ORDER BY i.id", ISSUE_SELECT);
        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("Failed to prepare list_issues")?;
        let rows = stmt
            .query_map([], IssueRow::from_row)
            .context("Failed to query issues")?;
        let mut issues = Vec::new();
        for row in rows {
            issues.push(row.context("Failed to read issue row")?.into_issue()?);
        }
        Ok(issues)
    }

    pub fn delete_issue(&self, id: i64) -> Result<bool> {
        let count = self
            .conn
            .execute("DELETE FROM issues WHERE id = ?1", params![id])
            .context("Failed to delete issue")?;
        Ok(count > 0)
    }

    // ── Statistics ────────────────────────────────────────────────────

    pub fn completion_stats(&self) -> Result<CompletionStats> {
        let (avg, min, max): (Option<f64>, Option<i64>, Option<i64>) = self
            .conn
            .query_row(
                "SELECT AVG(completed_in), MIN(completed_in), MAX(completed_in)
                 FROM issues WHERE completed_in IS NOT NULL",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .context("Failed to aggregate completion times")?;
        Ok(CompletionStats {
            avg_secs: avg.map(|a| a.round() as i64),
            min_secs: min,
            max_secs: max,
        })
    }

    /// Number of issues per state, in state order, including empty states.
    pub fn state_counts(&self) -> Result<Vec<(IssueState, i64)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT state, COUNT(*) FROM issues GROUP BY state")
            .context("Failed to prepare state_counts")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
            .context("Failed to count issues")?;
        let mut counts = vec![
            (IssueState::Created, 0),
            (IssueState::Assigned, 0),
            (IssueState::Done, 0),
            (IssueState::Canceled, 0),
        ];
        for row in rows {
            let (state, count) = row.context("Failed to read state count")?;
            let state = IssueState::from_str(&state).map_err(|e| anyhow::anyhow!(e))?;
            if let Some(slot) = counts.iter_mut().find(|(s, _)| *s == state) {
                slot.1 = count;
            }
        }
        Ok(counts)
    }
}

/// `needle` must already be lowercased.
fn contains_folded(field: &str, needle: &str) -> bool {
    field.to_lowercase().contains(needle)
}

/// Fixed-width UTC stamp so session ages compare as text.
fn session_stamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .with_context(|| format!("Invalid timestamp in database: {}", raw))
}

// ── Row types ─────────────────────────────────────────────────────────

struct UserRow {
    id: i64,
    username: String,
    first_name: String,
    last_name: String,
    is_superuser: bool,
    created_at: String,
}

impl UserRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            first_name: row.get(2)?,
            last_name: row.get(3)?,
            is_superuser: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn into_user(self) -> Result<User> {
        Ok(User {
            id: self.id,
            username: self.username,
            first_name: self.first_name,
            last_name: self.last_name,
            is_superuser: self.is_superuser,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

struct IssueRow {
    id: i64,
    name: String,
    description: String,
    state: String,
    completed_in: Option<i64>,
    created_at: String,
    assigned_at: Option<String>,
    creator_id: i64,
    creator_username: String,
    creator_first_name: String,
    creator_last_name: String,
    solver_id: Option<i64>,
    solver_username: Option<String>,
    solver_first_name: Option<String>,
    solver_last_name: Option<String>,
    category_id: Option<i64>,
    category_name: Option<String>,
}

impl IssueRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            state: row.get(3)?,
            completed_in: row.get(4)?,
            created_at: row.get(5)?,
            assigned_at: row.get(6)?,
            creator_id: row.get(7)?,
            creator_username: row.get(8)?,
            creator_first_name: row.get(9)?,
            creator_last_name: row.get(10)?,
            solver_id: row.get(11)?,
            solver_username: row.get(12)?,
            solver_first_name: row.get(13)?,
            solver_last_name: row.get(14)?,
            category_id: row.get(15)?,
            category_name: row.get(16)?,
        })
    }

    fn into_issue(self) -> Result<Issue> {
        let state = IssueState::from_str(&self.state).map_err(|e| anyhow::anyhow!(e))?;
        let solver = match (self.solver_id, self.solver_username) {
            (Some(id), Some(username)) => Some(UserRef {
                id,
                username,
                first_name: self.solver_first_name.unwrap_or_default(),
                last_name: self.solver_last_name.unwrap_or_default(),
            }),
            _ => None,
        };
        let category = match (self.category_id, self.category_name) {
            (Some(id), Some(name)) => Some(IssueCategory { id, name }),
            _ => None,
        };
        Ok(Issue {
            id: self.id,
            name: self.name,
            description: self.description,
            created_by: UserRef {
                id: self.creator_id,
                username: self.creator_username,
                first_name: self.creator_first_name,
                last_name: self.creator_last_name,
            },
            solver,
            category,
            state,
            completed_in_secs: self.completed_in,
            created_at: parse_timestamp(&self.created_at)?,
            assigned_at: self.assigned_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}
