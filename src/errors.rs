//! Typed errors for the tracker.
//!
//! The data layer returns `anyhow::Result` and attaches a `TrackerError`
//! where callers need to branch on the failure; the HTTP layer downcasts
//! it to pick a status code.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Issue {id} not found")]
    IssueNotFound { id: i64 },

    #[error("User {id} not found")]
    UserNotFound { id: i64 },

    #[error("Category {id} not found")]
    CategoryNotFound { id: i64 },

    #[error("Username '{username}' is already taken")]
    UsernameTaken { username: String },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_not_found_carries_id() {
        let err = TrackerError::IssueNotFound { id: 42 };
        match &err {
            TrackerError::IssueNotFound { id } => assert_eq!(*id, 42),
            _ => panic!("Expected IssueNotFound"),
        }
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn validation_message_names_field() {
        let err = TrackerError::Validation {
            field: "name".into(),
            message: "This field is required.".into(),
        };
        assert_eq!(err.to_string(), "name: This field is required.");
    }

    #[test]
    fn survives_a_trip_through_anyhow() {
        let err: anyhow::Error = TrackerError::UsernameTaken {
            username: "user_a".into(),
        }
        .into();
        assert!(matches!(
            err.downcast_ref::<TrackerError>(),
            Some(TrackerError::UsernameTaken { .. })
        ));
    }

    #[test]
    fn implements_std_error() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&TrackerError::LockPoisoned);
    }
}
