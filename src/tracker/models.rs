use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound for issue and category names.
pub const NAME_MAX_LEN: usize = 254;

fn join_name(first: &str, last: &str) -> String {
    format!("{} {}", first, last).trim().to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        join_name(&self.first_name, &self.last_name)
    }

    /// Full name, or the username when no name is recorded.
    pub fn display_name(&self) -> String {
        let full = self.full_name();
        if full.is_empty() {
            self.username.clone()
        } else {
            full
        }
    }

    pub fn to_ref(&self) -> UserRef {
        UserRef {
            id: self.id,
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }
}

/// The slice of a user that an issue carries for its creator and solver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRef {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl UserRef {
    pub fn display_name(&self) -> String {
        let full = join_name(&self.first_name, &self.last_name);
        if full.is_empty() {
            self.username.clone()
        } else {
            full
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssueCategory {
    pub id: i64,
    pub name: String,
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueState {
    #[default]
    Created,
    Assigned,
    Done,
    Canceled,
}

impl IssueState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Assigned => "assigned",
            Self::Done => "done",
            Self::Canceled => "canceled",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Assigned => "Assigned",
            Self::Done => "Done",
            Self::Canceled => "Canceled",
        }
    }

    /// Open issues can still be assigned, finished or canceled.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Created | Self::Assigned)
    }
}

impl fmt::Display for IssueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "assigned" => Ok(Self::Assigned),
            "done" => Ok(Self::Done),
            "canceled" => Ok(Self::Canceled),
            _ => Err(format!("Invalid issue state: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Issue {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_by: UserRef,
    pub solver: Option<UserRef>,
    pub category: Option<IssueCategory>,
    pub state: IssueState,
    /// Seconds between creation and completion, set once the issue is done.
    pub completed_in_secs: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
}

impl Issue {
    pub fn completed_in(&self) -> Option<Duration> {
        self.completed_in_secs.map(Duration::seconds)
    }

    pub fn is_solver(&self, user_id: i64) -> bool {
        self.solver.as_ref().is_some_and(|s| s.id == user_id)
    }
}

/// Fields accepted when an issue is first stored.
#[derive(Debug, Clone, Default)]
pub struct NewIssue {
    pub name: String,
    pub description: String,
    pub created_by: i64,
    pub solver_id: Option<i64>,
    pub category_id: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub is_superuser: bool,
}

/// Aggregate completion times over every finished issue.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionStats {
    pub avg_secs: Option<i64>,
    pub min_secs: Option<i64>,
    pub max_secs: Option<i64>,
}

impl CompletionStats {
    pub fn is_empty(&self) -> bool {
        self.avg_secs.is_none()
    }

    pub fn avg(&self) -> Option<String> {
        self.avg_secs.map(format_duration)
    }

    pub fn min(&self) -> Option<String> {
        self.min_secs.map(format_duration)
    }

    pub fn max(&self) -> Option<String> {
        self.max_secs.map(format_duration)
    }
}

/// Renders seconds as `H:MM:SS`, prefixed with `N day(s), ` past a day.
pub fn format_duration(total_secs: i64) -> String {
    let total = total_secs.max(0);
    let days = total / 86_400;
    let rem = total % 86_400;
    let clock = format!("{}:{:02}:{:02}", rem / 3600, (rem % 3600) / 60, rem % 60);
    match days {
        0 => clock,
        1 => format!("1 day, {}", clock),
        n => format!("{} days, {}", n, clock),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(first: &str, last: &str) -> User {
        User {
            id: 1,
            username: "jsmith".into(),
            first_name: first.into(),
            last_name: last.into(),
            is_superuser: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_issue_state_roundtrip() {
        for s in &["created", "assigned", "done", "canceled"] {
            let parsed: IssueState = s.parse().unwrap();
            assert_eq!(parsed.as_str(), *s);
        }
        assert!("cre".parse::<IssueState>().is_err());
    }

    #[test]
    fn test_issue_state_serde_is_lowercase() {
        assert_eq!(
            serde_json::to_string(&IssueState::Assigned).unwrap(),
            "\"assigned\""
        );
        assert_eq!(
            serde_json::from_str::<IssueState>("\"canceled\"").unwrap(),
            IssueState::Canceled
        );
    }

    #[test]
    fn test_only_created_and_assigned_are_open() {
        assert!(IssueState::Created.is_open());
        assert!(IssueState::Assigned.is_open());
        assert!(!IssueState::Done.is_open());
        assert!(!IssueState::Canceled.is_open());
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        assert_eq!(user("John", "Smith").display_name(), "John Smith");
        assert_eq!(user("John", "").display_name(), "John");
        assert_eq!(user("", "").display_name(), "jsmith");
        assert_eq!(user("", "").to_ref().display_name(), "jsmith");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0:00:00");
        assert_eq!(format_duration(3 * 3600 + 5 * 60 + 9), "3:05:09");
        assert_eq!(format_duration(86_400 + 61), "1 day, 0:01:01");
        assert_eq!(format_duration(3 * 86_400), "3 days, 0:00:00");
        assert_eq!(format_duration(-5), "0:00:00");
    }

    #[test]
    fn test_completion_stats_formatting() {
        let stats = CompletionStats {
            avg_secs: Some(90),
            min_secs: Some(60),
            max_secs: Some(120),
        };
        assert!(!stats.is_empty());
        assert_eq!(stats.avg().as_deref(), Some("0:01:30"));
        assert_eq!(stats.min().as_deref(), Some("0:01:00"));
        assert_eq!(stats.max().as_deref(), Some("0:02:00"));
        assert!(CompletionStats::default().is_empty());
        assert_eq!(CompletionStats::default().avg(), None);
    }
}
