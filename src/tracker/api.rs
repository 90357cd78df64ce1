use std::sync::Arc;

use anyhow::Result;
use axum::{
    Form, Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};

use super::auth::CurrentUser;
use super::db::{DbHandle, TrackerDb};
use super::editable::{EditError, EditRequest};
use super::forms::{ISSUE_EDITOR, IssueForm};
use super::permissions;
use super::select;
use super::templates::Templates;
use crate::errors::TrackerError;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub db: DbHandle,
    pub templates: Templates,
}

impl AppState {
    pub fn new(db: TrackerDb) -> Result<Self> {
        Ok(Self {
            db: DbHandle::new(db),
            templates: Templates::load()?,
        })
    }
}

pub type SharedState = Arc<AppState>;

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Forbidden(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<TrackerError>() {
            Some(
                e @ (TrackerError::IssueNotFound { .. }
                | TrackerError::UserNotFound { .. }
                | TrackerError::CategoryNotFound { .. }),
            ) => ApiError::NotFound(e.to_string()),
            Some(e @ TrackerError::PermissionDenied(_)) => ApiError::Forbidden(e.to_string()),
            Some(e @ (TrackerError::Validation { .. } | TrackerError::UsernameTaken { .. })) => {
                ApiError::BadRequest(e.to_string())
            }
            _ => {
                tracing::error!(error = %format!("{:#}", err), "request failed");
                ApiError::Internal(err.to_string())
            }
        }
    }
}

/// A plain `302 Found` redirect.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

// ── Router ────────────────────────────────────────────────────────────

/// Endpoints called from scripts rather than navigated to.
pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/issue/edit/{id}/", post(edit_issue))
        .route("/users/", post(select::search_users))
        .route("/categories/", post(select::search_categories))
        .route("/health", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn edit_issue(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Form(request): Form<EditRequest>,
) -> Result<Response, ApiError> {
    let outcome = state
        .db
        .call(move |db| {
            let mut issue = db
                .get_issue(id)?
                .ok_or(TrackerError::IssueNotFound { id })?;
            if !permissions::can_edit(&user, &issue) {
                tracing::info!(issue_id = id, user_id = user.id, "inline edit denied");
                return Err(TrackerError::PermissionDenied(
                    "only the creator may edit this issue".into(),
                )
                .into());
            }
            let form = IssueForm::new(db);
            Ok(ISSUE_EDITOR.dispatch(&mut issue, &form, db, &request))
        })
        .await?;

    match outcome {
        Ok(()) => Ok(StatusCode::OK.into_response()),
        Err(e) => Ok(e.into_response()),
    }
}

// ── Test helpers ──────────────────────────────────────────────────────
