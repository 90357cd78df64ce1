//! Ajax search endpoints behind the solver and category pickers on the
//! issue detail page (`static/tracker.js`).
//!
//! Both take a form-encoded `q` and answer with a JSON array of options.
//! A missing or blank query returns an empty list instead of every row.

use axum::extract::{Form, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::api::{ApiError, SharedState};
use super::auth::{CurrentUser, login_redirect};
use super::models::{IssueCategory, User};
use super::permissions;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Username", default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl From<&User> for SelectOption {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.display_name(),
            username: Some(user.username.clone()),
        }
    }
}

impl From<&IssueCategory> for SelectOption {
    fn from(category: &IssueCategory) -> Self {
        Self {
            id: category.id,
            name: category.name.clone(),
            username: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

impl SearchQuery {
    /// The trimmed query, or `None` when there is nothing to search for.
    pub fn term(&self) -> Option<String> {
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string)
    }
}

pub async fn search_users(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Form(query): Form<SearchQuery>,
) -> Result<Response, ApiError> {
    if !permissions::can_search(&user) {
        return Ok(login_redirect("/users/"));
    }
    let Some(term) = query.term() else {
        return Ok(Json(Vec::<SelectOption>::new()).into_response());
    };
    let users = state.db.call(move |db| db.search_users(&term)).await?;
    let options: Vec<SelectOption> = users.iter().map(SelectOption::from).collect();
    Ok(Json(options).into_response())
}

pub async fn search_categories(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Form(query): Form<SearchQuery>,
) -> Result<Response, ApiError> {
    if !permissions::can_search(&user) {
        return Ok(login_redirect("/categories/"));
    }
    let Some(term) = query.term() else {
        return Ok(Json(Vec::<SelectOption>::new()).into_response());
    };
    let categories = state
        .db
        .call(move |db| db.search_categories(&term))
        .await?;
    let options: Vec<SelectOption> = categories.iter().map(SelectOption::from).collect();
    Ok(Json(options).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn user_option_serializes_with_username() {
        let user = User {
            id: 3,
            username: "user_d".into(),
            first_name: "John".into(),
            last_name: "Smith".into(),
            is_superuser: false,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(SelectOption::from(&user)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"ID": 3, "Name": "John Smith", "Username": "user_d"})
        );
    }

    #[test]
    fn category_option_omits_username() {
        let cat = IssueCategory {
            id: 1,
            name: "Bug".into(),
        };
        let json = serde_json::to_value(SelectOption::from(&cat)).unwrap();
        assert_eq!(json, serde_json::json!({"ID": 1, "Name": "Bug"}));
    }

    #[test]
    fn blank_queries_have_no_term() {
        assert_eq!(SearchQuery { q: None }.term(), None);
        assert_eq!(SearchQuery { q: Some("  ".into()) }.term(), None);
        assert_eq!(
            SearchQuery { q: Some(" jo ".into()) }.term(),
            Some("jo".to_string())
        );
    }
}
