//! Generic inline-edit dispatcher.
//!
//! The front-end editing widget posts `name`, `value` and `pk` for a single
//! field. A table of [`FieldBinding`]s maps the posted name to the form
//! field that validates the raw value and to the (possibly dotted) model
//! path that receives the cleaned value. Entities expose typed setters for
//! the paths they accept through [`Editable`], so no reflection is needed.
//!
//! Outcomes map onto HTTP statuses in [`EditError`]'s `IntoResponse`:
//!
//! | Outcome                               | Status |
//! |---------------------------------------|--------|
//! | saved                                 | 200    |
//! | missing `name`/`value`, unknown field | 400    |
//! | unknown or dangling model path        | 400    |
//! | value rejected by the form field      | 406    |
//! | storage failure                       | 500    |

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use thiserror::Error;

use super::models::{IssueCategory, UserRef};

/// A cleaned form value, ready to be assigned to a model path.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Category(Option<IssueCategory>),
    User(Option<UserRef>),
}

impl FieldValue {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Category(_) => "category",
            Self::User(_) => "user",
        }
    }
}

/// Maps a posted field name onto a form field and a model path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldBinding {
    pub post_name: &'static str,
    pub form_field: &'static str,
    pub model_field: &'static str,
    save: Option<&'static str>,
}

impl FieldBinding {
    /// Posted name, form field and model field are all `name`.
    pub const fn same(name: &'static str) -> Self {
        Self {
            post_name: name,
            form_field: name,
            model_field: name,
            save: None,
        }
    }

    pub const fn mapped(
        post_name: &'static str,
        form_field: &'static str,
        model_field: &'static str,
    ) -> Self {
        Self {
            post_name,
            form_field,
            model_field,
            save: None,
        }
    }

    /// Persist `target` instead of the object owning the last path segment.
    pub const fn with_save(self, target: &'static str) -> Self {
        Self {
            save: Some(target),
            ..self
        }
    }

    pub fn path(&self) -> Vec<&'static str> {
        split_path(self.model_field)
    }

    /// The object to persist after assignment. Empty means the root entity.
    pub fn save_target(&self) -> Vec<&'static str> {
        match self.save {
            Some(target) => split_path(target),
            None => {
                let mut path = self.path();
                path.pop();
                path
            }
        }
    }
}

fn split_path(path: &'static str) -> Vec<&'static str> {
    path.split('.').filter(|s| !s.is_empty()).collect()
}

#[derive(Debug, Error)]
pub enum EditError {
    #[error("Missing parameter '{0}'")]
    MissingParameter(&'static str),

    #[error("Unknown field '{0}'")]
    UnknownField(String),

    #[error("Cannot assign to '{0}'")]
    UnknownPath(String),

    #[error("'{0}' has no related object")]
    MissingRelated(String),

    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl EditError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingParameter(_)
            | Self::UnknownField(_)
            | Self::UnknownPath(_)
            | Self::MissingRelated(_) => StatusCode::BAD_REQUEST,
            Self::Invalid(_) => StatusCode::NOT_ACCEPTABLE,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EditError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::Invalid(msg) => (status, format!("Error: {}", msg)).into_response(),
            Self::Storage(e) => {
                tracing::error!(error = %e, "inline edit failed to persist");
                (status, "Internal server error").into_response()
            }
            other => (status, other.to_string()).into_response(),
        }
    }
}

/// Validates raw posted values for a set of form fields.
pub trait FieldCleaner {
    fn clean(&self, form_field: &str, raw: &str) -> Result<FieldValue, EditError>;
}

/// An entity whose fields can be patched one path at a time.
pub trait Editable {
    type Store;

    fn set_path(&mut self, path: &[&str], value: FieldValue) -> Result<(), EditError>;

    /// Persist the object at `target` (empty = self).
    fn persist(&mut self, target: &[&str], store: &Self::Store) -> Result<(), EditError>;
}

/// Form body posted by the inline-edit widget.
#[derive(Debug, Default, Deserialize)]
pub struct EditRequest {
    pub name: Option<String>,
    pub value: Option<String>,
    /// Sent by the widget; the entity id is taken from the URL instead.
    pub pk: Option<String>,
}

pub struct EditableDispatcher {
    bindings: &'static [FieldBinding],
}

impl EditableDispatcher {
    pub const fn new(bindings: &'static [FieldBinding]) -> Self {
        Self { bindings }
    }

    pub fn find(&self, post_name: &str) -> Option<&FieldBinding> {
        self.bindings.iter().find(|b| b.post_name == post_name)
    }

    /// Clean, assign and persist one posted field on `entity`.
    pub fn dispatch<E, C>(
        &self,
        entity: &mut E,
        cleaner: &C,
        store: &E::Store,
        request: &EditRequest,
    ) -> Result<(), EditError>
    where
        E: Editable,
        C: FieldCleaner,
    {
        let name = request
            .name
            .as_deref()
            .ok_or(EditError::MissingParameter("name"))?;
        let raw = request
            .value
            .as_deref()
            .ok_or(EditError::MissingParameter("value"))?;
        let binding = self
            .find(name)
            .ok_or_else(|| EditError::UnknownField(name.to_string()))?;

        let value = cleaner.clean(binding.form_field, raw)?;
        entity.set_path(&binding.path(), value)?;
        entity.persist(&binding.save_target(), store)?;

        tracing::debug!(field = binding.post_name, "inline edit applied");
        Ok(())
    }
}
