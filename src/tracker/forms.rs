//! Issue forms: field validation for the create page and the inline editor,
//! and the typed setters that let the editor patch an `Issue`.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::db::TrackerDb;
use super::editable::{EditError, Editable, EditableDispatcher, FieldBinding, FieldCleaner, FieldValue};
use super::models::{Issue, IssueCategory, NAME_MAX_LEN, NewIssue, UserRef};

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";
pub const SOLVER_LOCKED: &str = "The solver of a done or canceled issue cannot be changed.";

/// Fields of an issue the inline editor may change.
pub const ISSUE_FIELDS: &[FieldBinding] = &[
    FieldBinding::same("name"),
    FieldBinding::same("description"),
    FieldBinding::same("category"),
    FieldBinding::same("solver"),
    FieldBinding::mapped("category_name", "category_name", "category.name").with_save("category"),
];

pub const ISSUE_EDITOR: EditableDispatcher = EditableDispatcher::new(ISSUE_FIELDS);

/// Field errors keyed by form field name.
pub type FieldErrors = BTreeMap<&'static str, String>;

fn clean_name(raw: &str) -> Result<String, EditError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(EditError::Invalid(REQUIRED.into()));
    }
    let len = value.chars().count();
    if len > NAME_MAX_LEN {
        return Err(EditError::Invalid(format!(
            "Ensure this value has at most {} characters (it has {}).",
            NAME_MAX_LEN, len
        )));
    }
    Ok(value.to_string())
}

fn clean_text(raw: &str) -> Result<String, EditError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(EditError::Invalid(REQUIRED.into()));
    }
    Ok(value.to_string())
}

/// Blank means "no choice"; anything else must be an existing id.
fn choice_id(raw: &str) -> Result<Option<i64>, EditError> {
    let value = raw.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<i64>()
        .map(Some)
        .map_err(|_| EditError::Invalid(INVALID_CHOICE.into()))
}

/// Validates issue fields against the database.
pub struct IssueForm<'a> {
    db: &'a TrackerDb,
}

impl<'a> IssueForm<'a> {
    pub fn new(db: &'a TrackerDb) -> Self {
        Self { db }
    }

    fn clean_category(&self, raw: &str) -> Result<Option<IssueCategory>, EditError> {
        match choice_id(raw)? {
            None => Ok(None),
            Some(id) => self
                .db
                .get_category(id)?
                .map(Some)
                .ok_or_else(|| EditError::Invalid(INVALID_CHOICE.into())),
        }
    }

    fn clean_solver(&self, raw: &str) -> Result<Option<UserRef>, EditError> {
        match choice_id(raw)? {
            None => Ok(None),
            Some(id) => self
                .db
                .get_user(id)?
                .map(|u| Some(u.to_ref()))
                .ok_or_else(|| EditError::Invalid(INVALID_CHOICE.into())),
        }
    }
}

impl FieldCleaner for IssueForm<'_> {
    fn clean(&self, form_field: &str, raw: &str) -> Result<FieldValue, EditError> {
        match form_field {
            "name" | "category_name" => clean_name(raw).map(FieldValue::Text),
            "description" => clean_text(raw).map(FieldValue::Text),
            "category" => self.clean_category(raw).map(FieldValue::Category),
            "solver" => self.clean_solver(raw).map(FieldValue::User),
            other => Err(EditError::UnknownField(other.to_string())),
        }
    }
}

impl Editable for Issue {
    type Store = TrackerDb;

    fn set_path(&mut self, path: &[&str], value: FieldValue) -> Result<(), EditError> {
        match (path, value) {
            (["name"], FieldValue::Text(v)) => self.name = v,
            (["description"], FieldValue::Text(v)) => self.description = v,
            (["category"], FieldValue::Category(v)) => self.category = v,
            (["solver"], FieldValue::User(v)) => {
                let unchanged = v.as_ref().map(|s| s.id) == self.solver.as_ref().map(|s| s.id);
                if !self.state.is_open() && !unchanged {
                    return Err(EditError::Invalid(SOLVER_LOCKED.into()));
                }
                self.solver = v
            }
            (["category", "name"], FieldValue::Text(v)) => {
                self.category
                    .as_mut()
                    .ok_or_else(|| EditError::MissingRelated("category".into()))?
                    .name = v
            }
            (path, value) => {
                return Err(EditError::UnknownPath(format!(
                    "{} ({})",
                    path.join("."),
                    value.kind()
                )));
            }
        }
        Ok(())
    }

    fn persist(&mut self, target: &[&str], db: &TrackerDb) -> Result<(), EditError> {
        match target {
            [] => db.save_issue(self)?,
            ["category"] => {
                let category = self
                    .category
                    .as_ref()
                    .ok_or_else(|| EditError::MissingRelated("category".into()))?;
                db.save_category(category)?
            }
            other => return Err(EditError::UnknownPath(other.join("."))),
        }
        Ok(())
    }
}

/// The issue creation form as posted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateIssueForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub solver: String,
}

pub enum FormOutcome {
    Valid(NewIssue),
    Invalid(FieldErrors),
}

impl CreateIssueForm {
    pub fn validate(&self, db: &TrackerDb, created_by: i64) -> Result<FormOutcome> {
        let form = IssueForm::new(db);
        let mut errors = FieldErrors::new();
        let mut new = NewIssue {
            created_by,
            ..Default::default()
        };

        let fields: [(&'static str, &str); 4] = [
            ("name", self.name.as_str()),
            ("description", self.description.as_str()),
            ("category", self.category.as_str()),
            ("solver", self.solver.as_str()),
        ];
        for (field, raw) in fields {
            match form.clean(field, raw) {
                Ok(FieldValue::Text(v)) if field == "name" => new.name = v,
                Ok(FieldValue::Text(v)) => new.description = v,
                Ok(FieldValue::Category(c)) => new.category_id = c.map(|c| c.id),
                Ok(FieldValue::User(u)) => new.solver_id = u.map(|u| u.id),
                Err(EditError::Invalid(msg)) => {
                    errors.insert(field, msg);
                }
                Err(other) => return Err(other.into()),
            }
        }

        if errors.is_empty() {
            Ok(FormOutcome::Valid(new))
        } else {
            Ok(FormOutcome::Invalid(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::editable::EditRequest;
    use crate::tracker::models::{IssueState, NewUser};

    fn setup() -> (TrackerDb, Issue) {
        let db = TrackerDb::open_in_memory().unwrap();
        let a = db
            .create_user(&NewUser {
                username: "user_a".into(),
                password: "password".into(),
                ..Default::default()
            })
            .unwrap();
        let issue = db
            .create_issue(&NewIssue {
                name: "Test".into(),
                description: "Test description.".into(),
                created_by: a.id,
                ..Default::default()
            })
            .unwrap();
        (db, issue)
    }

    fn edit(db: &TrackerDb, issue: &mut Issue, name: &str, value: &str) -> Result<(), EditError> {
        let request = EditRequest {
            name: Some(name.into()),
            value: Some(value.into()),
            pk: Some(issue.id.to_string()),
        };
        ISSUE_EDITOR.dispatch(issue, &IssueForm::new(db), db, &request)
    }

    #[test]
    fn edit_name_persists() {
        let (db, mut issue) = setup();
        edit(&db, &mut issue, "name", "  Renamed  ").unwrap();
        assert_eq!(db.get_issue(issue.id).unwrap().unwrap().name, "Renamed");
    }

    #[test]
    fn edit_name_too_long_is_rejected() {
        let (db, mut issue) = setup();
        let err = edit(&db, &mut issue, "name", &"x".repeat(255)).unwrap_err();
        assert!(matches!(err, EditError::Invalid(ref m) if m.contains("at most 254")));
        assert_eq!(db.get_issue(issue.id).unwrap().unwrap().name, "Test");
    }

    #[test]
    fn edit_blank_description_is_rejected() {
        let (db, mut issue) = setup();
        let err = edit(&db, &mut issue, "description", "   ").unwrap_err();
        assert!(matches!(err, EditError::Invalid(ref m) if m == REQUIRED));
    }

    #[test]
    fn edit_solver_assigns_issue() {
        let (db, mut issue) = setup();
        let b = db
            .create_user(&NewUser {
                username: "user_b".into(),
                password: "password".into(),
                ..Default::default()
            })
            .unwrap();
        edit(&db, &mut issue, "solver", &b.id.to_string()).unwrap();

        let stored = db.get_issue(issue.id).unwrap().unwrap();
        assert_eq!(stored.state, IssueState::Assigned);
        assert_eq!(stored.solver.map(|s| s.id), Some(b.id));

        edit(&db, &mut issue, "solver", "").unwrap();
        let stored = db.get_issue(issue.id).unwrap().unwrap();
        assert_eq!(stored.state, IssueState::Created);
        assert!(stored.solver.is_none());
    }

    #[test]
    fn edit_solver_of_closed_issue_is_rejected() {
        let (db, mut issue) = setup();
        let b = db
            .create_user(&NewUser {
                username: "user_b".into(),
                password: "password".into(),
                ..Default::default()
            })
            .unwrap();
        edit(&db, &mut issue, "solver", &b.id.to_string()).unwrap();
        issue.state = IssueState::Done;
        db.save_issue(&mut issue).unwrap();

        let creator = issue.created_by.id.to_string();
        for raw in ["", creator.as_str()] {
            let err = edit(&db, &mut issue, "solver", raw).unwrap_err();
            assert!(matches!(err, EditError::Invalid(ref m) if m == SOLVER_LOCKED));
        }
        // posting the current solver again is harmless
        edit(&db, &mut issue, "solver", &b.id.to_string()).unwrap();

        let stored = db.get_issue(issue.id).unwrap().unwrap();
        assert_eq!(stored.state, IssueState::Done);
        assert_eq!(stored.solver.map(|s| s.id), Some(b.id));
        assert!(stored.assigned_at.is_some());
    }

    #[test]
    fn edit_unknown_solver_is_invalid_choice() {
        let (db, mut issue) = setup();
        for raw in ["999", "abc"] {
            let err = edit(&db, &mut issue, "solver", raw).unwrap_err();
            assert!(matches!(err, EditError::Invalid(ref m) if m == INVALID_CHOICE));
        }
    }

    #[test]
    fn edit_category_and_its_name() {
        let (db, mut issue) = setup();
        let cat = db.create_category("Bug").unwrap();

        // nothing to rename yet
        let err = edit(&db, &mut issue, "category_name", "Defect").unwrap_err();
        assert!(matches!(err, EditError::MissingRelated(_)));

        edit(&db, &mut issue, "category", &cat.id.to_string()).unwrap();
        edit(&db, &mut issue, "category_name", "Defect").unwrap();

        assert_eq!(db.get_category(cat.id).unwrap().unwrap().name, "Defect");
        let stored = db.get_issue(issue.id).unwrap().unwrap();
        assert_eq!(stored.category.map(|c| c.name), Some("Defect".to_string()));
    }

    #[test]
    fn create_form_valid() {
        let (db, issue) = setup();
        let cat = db.create_category("Bug").unwrap();
        let form = CreateIssueForm {
            name: "New".into(),
            description: "Something broke.".into(),
            category: cat.id.to_string(),
            solver: issue.created_by.id.to_string(),
        };
        match form.validate(&db, issue.created_by.id).unwrap() {
            FormOutcome::Valid(new) => {
                assert_eq!(new.name, "New");
                assert_eq!(new.description, "Something broke.");
                assert_eq!(new.category_id, Some(cat.id));
                assert_eq!(new.solver_id, Some(issue.created_by.id));
                assert_eq!(new.created_by, issue.created_by.id);
            }
            FormOutcome::Invalid(errors) => panic!("unexpected errors: {:?}", errors),
        }
    }

    #[test]
    fn create_form_collects_every_error() {
        let (db, issue) = setup();
        let form = CreateIssueForm {
            category: "42".into(),
            ..Default::default()
        };
        match form.validate(&db, issue.created_by.id).unwrap() {
            FormOutcome::Valid(_) => panic!("expected errors"),
            FormOutcome::Invalid(errors) => {
                assert_eq!(errors.get("name").map(String::as_str), Some(REQUIRED));
                assert_eq!(errors.get("description").map(String::as_str), Some(REQUIRED));
                assert_eq!(errors.get("category").map(String::as_str), Some(INVALID_CHOICE));
                assert!(!errors.contains_key("solver"));
            }
        }
    }
}
