//! Issue state machine.
//!
//! ```text
//! created ──(solver set)──> assigned ──(done)──> done
//!    │                         │
//!    └────────(cancel)─────────┴──────────────> canceled
//! ```
//!
//! Assignment is never requested explicitly: it is inferred from the
//! presence of a solver every time an issue is saved. `apply_save_rules`
//! runs on every persist, inside the transaction that writes the row.

use chrono::{DateTime, Utc};

use super::models::{Issue, IssueState};

/// Normalize an issue right before it is written.
pub fn apply_save_rules(issue: &mut Issue, now: DateTime<Utc>) {
    match issue.state {
        IssueState::Created if issue.solver.is_some() => {
            issue.state = IssueState::Assigned;
            if issue.assigned_at.is_none() {
                issue.assigned_at = Some(now);
            }
        }
        IssueState::Done if issue.completed_in_secs.is_none() => {
            let elapsed = (now - issue.created_at).num_seconds().max(0);
            issue.completed_in_secs = Some(elapsed);
        }
        IssueState::Assigned if issue.solver.is_none() => {
            issue.state = IssueState::Created;
            issue.assigned_at = None;
        }
        _ => {}
    }
}

/// Drop the solver of an open issue. Finished issues keep theirs.
pub fn unassign(issue: &mut Issue) -> bool {
    if !issue.state.is_open() {
        return false;
    }
    let changed = issue.solver.is_some() || issue.state != IssueState::Created;
    issue.solver = None;
    issue.assigned_at = None;
    issue.state = IssueState::Created;
    changed
}

/// The completion time is filled in by the next save.
pub fn mark_done(issue: &mut Issue) -> bool {
    if !issue.state.is_open() {
        return false;
    }
    issue.state = IssueState::Done;
    true
}

pub fn cancel(issue: &mut Issue) -> bool {
    if !issue.state.is_open() {
        return false;
    }
    issue.state = IssueState::Canceled;
    true
}
