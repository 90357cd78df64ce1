//! Issue tracker web application.
//!
//! ## Overview
//!
//! Users sign in, create issues, assign a solver, and close issues as done
//! or canceled. Completion times are recorded when an issue is finished and
//! aggregated on the list page. Pages are rendered on the server; the detail
//! page edits single fields in place through a small script.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐   HTTP   ┌──────────────────────────────────────────────────┐
//! │ Browser  │ ───────> │  server.rs  (axum Router, ServerConfig)          │
//! │          │ <─────── │    ├─ views.rs   (HTML pages, issue actions)     │
//! └──────────┘          │    └─ api.rs     (inline edit, search, AppState) │
//!                       │         │                                        │
//!                       │         │ EditableDispatcher::dispatch()         │
//!                       │         v                                        │
//!                       │  editable.rs + forms.rs  (bindings, validation)  │
//!                       │         │                                        │
//!                       │         │ TrackerDb::save_issue()                │
//!                       │         v                                        │
//!                       │  db.rs  ──>  lifecycle.rs  (save rules)          │
//!                       └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Supporting Modules
//!
//! | Module        | Responsibility                                         |
//! |---------------|--------------------------------------------------------|
//! | `models`      | `Issue`, `IssueCategory`, `IssueState`, `User`         |
//! | `auth`        | Password hashing, session cookie, `CurrentUser`        |
//! | `permissions` | Creator / solver / superuser checks                    |
//! | `select`      | JSON search behind the user and category pickers       |
//! | `templates`   | Embedded `minijinja` templates                         |
//!
//! ## Typical Request Flow (solver marks an issue done)
//!
//! 1. `GET /issue/done/{id}/` → `views::done_issue()`; `CurrentUser`
//!    resolves the session cookie or redirects to the sign-in page.
//! 2. `permissions::can_mark_done()` checks the caller is the solver or a
//!    superuser; otherwise the request lands back on the detail page.
//! 3. `lifecycle::mark_done()` flips the state and `TrackerDb::save_issue()`
//!    runs the save rules in the same transaction, filling `completed_in`.
//! 4. The list page picks the new time up in its completion statistics.

pub mod api;
pub mod auth;
pub mod db;
pub mod editable;
pub mod forms;
pub mod lifecycle;
pub mod models;
pub mod permissions;
pub mod select;
pub mod server;
pub mod templates;
pub mod views;
