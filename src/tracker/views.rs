//! HTML pages and the link-driven issue actions.

use axum::{
    Form, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};

use super::api::{ApiError, SharedState, found};
use super::auth::{self, CurrentUser};
use super::forms::{CreateIssueForm, FieldErrors, FormOutcome};
use super::lifecycle;
use super::models::{CompletionStats, Issue, User};
use super::permissions;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

// ── Template contexts ─────────────────────────────────────────────────

#[derive(Serialize)]
struct UserView {
    id: i64,
    username: String,
    display_name: String,
    is_superuser: bool,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name(),
            is_superuser: user.is_superuser,
        }
    }
}

#[derive(Serialize)]
struct IssueView {
    id: i64,
    name: String,
    description: String,
    created_by: String,
    solver: Option<String>,
    solver_id: Option<i64>,
    category: Option<String>,
    category_id: Option<i64>,
    state: &'static str,
    state_label: &'static str,
    completed_in: Option<String>,
    created_at: String,
    assigned_at: Option<String>,
}

impl From<&Issue> for IssueView {
    fn from(issue: &Issue) -> Self {
        Self {
            id: issue.id,
            name: issue.name.clone(),
            description: issue.description.clone(),
            created_by: issue.created_by.display_name(),
            solver: issue.solver.as_ref().map(|s| s.display_name()),
            solver_id: issue.solver.as_ref().map(|s| s.id),
            category: issue.category.as_ref().map(|c| c.name.clone()),
            category_id: issue.category.as_ref().map(|c| c.id),
            state: issue.state.as_str(),
            state_label: issue.state.label(),
            completed_in: issue
                .completed_in_secs
                .map(super::models::format_duration),
            created_at: issue.created_at.format(TIMESTAMP_FORMAT).to_string(),
            assigned_at: issue
                .assigned_at
                .map(|t| t.format(TIMESTAMP_FORMAT).to_string()),
        }
    }
}

#[derive(Serialize)]
struct StatsView {
    avg: Option<String>,
    min: Option<String>,
    max: Option<String>,
}

impl From<CompletionStats> for StatsView {
    fn from(stats: CompletionStats) -> Self {
        Self {
            avg: stats.avg(),
            min: stats.min(),
            max: stats.max(),
        }
    }
}

#[derive(Serialize)]
struct ListContext {
    user: UserView,
    issues: Vec<IssueView>,
    stats: StatsView,
}

#[derive(Serialize)]
struct DetailContext {
    user: UserView,
    issue: IssueView,
    categories: Vec<(i64, String)>,
    users: Vec<(i64, String)>,
    can_edit: bool,
    can_delete: bool,
    can_unassign: bool,
    can_mark_done: bool,
    can_cancel: bool,
}

#[derive(Serialize)]
struct CreateContext {
    user: UserView,
    form: CreateIssueForm,
    errors: FieldErrors,
    categories: Vec<(i64, String)>,
    users: Vec<(i64, String)>,
}

#[derive(Serialize)]
struct SigninContext {
    next: String,
    error: bool,
    logout: bool,
}

fn render<S: Serialize>(state: &SharedState, name: &str, context: S) -> Result<Response, ApiError> {
    let html = state.templates.render(name, context)?;
    Ok(Html(html).into_response())
}

fn detail_url(id: i64) -> String {
    format!("/issue/{}/", id)
}

// ── Router ────────────────────────────────────────────────────────────

pub fn views_router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_issues))
        .route("/issue/create/", get(create_page).post(create_issue))
        .route("/issue/{id}/", get(issue_detail))
        .route("/issue/delete/{id}/", get(delete_issue))
        .route("/issue/unassign/{id}/", get(unassign_issue))
        .route("/issue/done/{id}/", get(done_issue))
        .route("/issue/cancel/{id}/", get(cancel_issue))
        .route("/accounts/login/", get(login_page).post(login))
        .route("/accounts/logout/", get(logout))
}

// ── Issue pages ───────────────────────────────────────────────────────

async fn list_issues(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, ApiError> {
    let (issues, stats) = state
        .db
        .call(|db| Ok((db.list_issues()?, db.completion_stats()?)))
        .await?;
    let context = ListContext {
        user: UserView::from(&user),
        issues: issues.iter().map(IssueView::from).collect(),
        stats: stats.into(),
    };
    render(&state, "list.html", context)
}

async fn issue_detail(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let Some(issue) = state.db.call(move |db| db.get_issue(id)).await? else {
        return Err(ApiError::NotFound(format!("Issue {} not found", id)));
    };
    let (categories, users) = choices(&state).await?;

    let context = DetailContext {
        can_edit: permissions::can_edit(&user, &issue),
        can_delete: permissions::can_delete(&user, &issue),
        can_unassign: issue.state.is_open()
            && issue.solver.is_some()
            && permissions::can_unassign(&user, &issue),
        can_mark_done: issue.state.is_open() && permissions::can_mark_done(&user, &issue),
        can_cancel: issue.state.is_open() && permissions::can_cancel(&user, &issue),
        user: UserView::from(&user),
        issue: IssueView::from(&issue),
        categories,
        users,
    };
    render(&state, "detail.html", context)
}

/// Category and user choices for the create form and the detail pickers.
async fn choices(state: &SharedState) -> Result<(Vec<(i64, String)>, Vec<(i64, String)>), ApiError> {
    let (categories, users) = state
        .db
        .call(|db| Ok((db.list_categories()?, db.list_users()?)))
        .await?;
    Ok((
        categories.into_iter().map(|c| (c.id, c.name)).collect(),
        users.iter().map(|u| (u.id, u.display_name())).collect(),
    ))
}

async fn create_page(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, ApiError> {
    let (categories, users) = choices(&state).await?;
    let context = CreateContext {
        user: UserView::from(&user),
        form: CreateIssueForm::default(),
        errors: FieldErrors::new(),
        categories,
        users,
    };
    render(&state, "create.html", context)
}

async fn create_issue(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<CreateIssueForm>,
) -> Result<Response, ApiError> {
    let created_by = user.id;
    let submitted = form.clone();
    let outcome = state
        .db
        .call(move |db| match submitted.validate(db, created_by)? {
            FormOutcome::Valid(new) => Ok(Ok(db.create_issue(&new)?)),
            FormOutcome::Invalid(errors) => Ok(Err(errors)),
        })
        .await?;

    match outcome {
        Ok(issue) => {
            tracing::info!(issue_id = issue.id, user_id = created_by, state = %issue.state, "issue created");
            Ok(found(&detail_url(issue.id)))
        }
        Err(errors) => {
            let (categories, users) = choices(&state).await?;
            let context = CreateContext {
                user: UserView::from(&user),
                form,
                errors,
                categories,
                users,
            };
            render(&state, "create.html", context)
        }
    }
}

// ── Issue actions ─────────────────────────────────────────────────────

/// Load an issue, check `allowed`, apply `transition` and save when it
/// changed something. Always lands on the detail page; a denied request
/// leaves the issue untouched.
async fn transition_issue(
    state: SharedState,
    user: User,
    id: i64,
    action: &'static str,
    allowed: fn(&User, &Issue) -> bool,
    transition: fn(&mut Issue) -> bool,
) -> Result<Response, ApiError> {
    let user_id = user.id;
    let applied = state
        .db
        .call(move |db| {
            let Some(mut issue) = db.get_issue(id)? else {
                return Ok(None);
            };
            if !allowed(&user, &issue) {
                return Ok(Some(false));
            }
            if transition(&mut issue) {
                db.save_issue(&mut issue)?;
            }
            Ok(Some(true))
        })
        .await?;

    match applied {
        None => Err(ApiError::NotFound(format!("Issue {} not found", id))),
        Some(true) => Ok(found(&detail_url(id))),
        Some(false) => {
            tracing::info!(issue_id = id, user_id, action, "issue action denied");
            Ok(found(&detail_url(id)))
        }
    }
}

async fn unassign_issue(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    transition_issue(
        state,
        user,
        id,
        "unassign",
        permissions::can_unassign,
        lifecycle::unassign,
    )
    .await
}

async fn done_issue(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    transition_issue(
        state,
        user,
        id,
        "done",
        permissions::can_mark_done,
        lifecycle::mark_done,
    )
    .await
}

async fn cancel_issue(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    transition_issue(
        state,
        user,
        id,
        "cancel",
        permissions::can_cancel,
        lifecycle::cancel,
    )
    .await
}

async fn delete_issue(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let user_id = user.id;
    let deleted = state
        .db
        .call(move |db| {
            let Some(issue) = db.get_issue(id)? else {
                return Ok(None);
            };
            if !permissions::can_delete(&user, &issue) {
                return Ok(Some(false));
            }
            Ok(Some(db.delete_issue(id)?))
        })
        .await?;

    match deleted {
        None => Err(ApiError::NotFound(format!("Issue {} not found", id))),
        Some(true) => {
            tracing::info!(issue_id = id, user_id, "issue deleted");
            Ok(found("/"))
        }
        Some(false) => {
            tracing::info!(issue_id = id, user_id, action = "delete", "issue action denied");
            Ok(found(&detail_url(id)))
        }
    }
}

// ── Sign in / out ─────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct LoginQuery {
    next: Option<String>,
    logout: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    next: Option<String>,
}

async fn login_page(
    State(state): State<SharedState>,
    Query(query): Query<LoginQuery>,
) -> Result<Response, ApiError> {
    let context = SigninContext {
        next: auth::safe_next(query.next.as_deref()),
        error: false,
        logout: query.logout.is_some(),
    };
    render(&state, "signin.html", context)
}

async fn login(
    State(state): State<SharedState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    let next = auth::safe_next(form.next.as_deref());
    let username = form.username.clone();
    let session = state
        .db
        .call(move |db| match db.authenticate(&form.username, &form.password)? {
            Some(user) => Ok(Some(db.create_session(user.id)?)),
            None => Ok(None),
        })
        .await?;

    match session {
        Some(token) => {
            tracing::info!(username = %username, "signed in");
            Ok((
                StatusCode::FOUND,
                [
                    (header::LOCATION, next),
                    (header::SET_COOKIE, auth::session_cookie(&token)),
                ],
            )
                .into_response())
        }
        None => {
            tracing::info!(username = %username, "sign-in rejected");
            let context = SigninContext {
                next,
                error: true,
                logout: false,
            };
            render(&state, "signin.html", context)
        }
    }
}

async fn logout(State(state): State<SharedState>, headers: HeaderMap) -> Result<Response, ApiError> {
    if let Some(token) = auth::session_token(&headers) {
        state.db.call(move |db| db.delete_session(&token)).await?;
    }
    Ok((
        StatusCode::FOUND,
        [
            (header::LOCATION, "/accounts/login/?logout=1".to_string()),
            (header::SET_COOKIE, auth::expired_session_cookie()),
        ],
    )
        .into_response())
}
