//! Who may do what to an issue.
//!
//! Superusers may do everything. Otherwise ownership decides: the creator
//! manages the issue, the current solver closes it.

use super::models::{Issue, User};

pub fn can_edit(user: &User, issue: &Issue) -> bool {
    user.is_superuser || issue.created_by.id == user.id
}

pub fn can_delete(user: &User, issue: &Issue) -> bool {
    can_edit(user, issue)
}

pub fn can_unassign(user: &User, issue: &Issue) -> bool {
    can_edit(user, issue)
}

pub fn can_cancel(user: &User, issue: &Issue) -> bool {
    can_edit(user, issue)
}

pub fn can_mark_done(user: &User, issue: &Issue) -> bool {
    user.is_superuser || issue.is_solver(user.id)
}

/// User and category lookups are reserved for superusers.
pub fn can_search(user: &User) -> bool {
    user.is_superuser
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::models::IssueState;
    use chrono::Utc;

    fn user(id: i64, is_superuser: bool) -> User {
        User {
            id,
            username: format!("user_{}", id),
            first_name: String::new(),
            last_name: String::new(),
            is_superuser,
            created_at: Utc::now(),
        }
    }

    fn issue(created_by: &User, solver: Option<&User>) -> Issue {
        Issue {
            id: 1,
            name: "Test".into(),
            description: "Test description.".into(),
            created_by: created_by.to_ref(),
            solver: solver.map(User::to_ref),
            category: None,
            state: if solver.is_some() {
                IssueState::Assigned
            } else {
                IssueState::Created
            },
            completed_in_secs: None,
            created_at: Utc::now(),
            assigned_at: None,
        }
    }

    #[test]
    fn creator_manages_own_issue() {
        let a = user(1, false);
        let issue = issue(&a, None);
        assert!(can_edit(&a, &issue));
        assert!(can_delete(&a, &issue));
        assert!(can_unassign(&a, &issue));
        assert!(can_cancel(&a, &issue));
    }

    #[test]
    fn other_users_cannot_manage() {
        let a = user(1, false);
        let b = user(2, false);
        let issue = issue(&a, Some(&b));
        assert!(!can_edit(&b, &issue));
        assert!(!can_delete(&b, &issue));
        assert!(!can_unassign(&b, &issue));
        assert!(!can_cancel(&b, &issue));
    }

    #[test]
    fn only_solver_marks_done() {
        let a = user(1, false);
        let b = user(2, false);
        let issue_ = issue(&a, Some(&b));
        assert!(can_mark_done(&b, &issue_));
        assert!(!can_mark_done(&a, &issue_));

        let unassigned = issue(&a, None);
        assert!(!can_mark_done(&a, &unassigned));
    }

    #[test]
    fn superuser_may_do_everything() {
        let a = user(1, false);
        let root = user(99, true);
        let issue = issue(&a, None);
        assert!(can_edit(&root, &issue));
        assert!(can_delete(&root, &issue));
        assert!(can_mark_done(&root, &issue));
        assert!(can_search(&root));
        assert!(!can_search(&a));
    }
}
