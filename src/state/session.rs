//! Registration session model
//!
//! A session tracks one user's progress through the registration form.
//! The current step is stored explicitly and fields can only be filled in
//! the order name, age, email.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use crate::utils::errors::{BotError, Result};

/// Step of the registration form a session is waiting on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormStep {
    AwaitingName,
    AwaitingAge,
    AwaitingEmail,
    Complete,
}

impl FormStep {
    /// The step that follows this one
    pub fn next(self) -> FormStep {
        match self {
            FormStep::AwaitingName => FormStep::AwaitingAge,
            FormStep::AwaitingAge => FormStep::AwaitingEmail,
            FormStep::AwaitingEmail | FormStep::Complete => FormStep::Complete,
        }
    }

    /// Field this step accepts, `None` once the form is complete
    pub fn expected_field(self) -> Option<FormField> {
        match self {
            FormStep::AwaitingName => Some(FormField::Name),
            FormStep::AwaitingAge => Some(FormField::Age),
            FormStep::AwaitingEmail => Some(FormField::Email),
            FormStep::Complete => None,
        }
    }
}

impl std::fmt::Display for FormStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormStep::AwaitingName => write!(f, "awaiting_name"),
            FormStep::AwaitingAge => write!(f, "awaiting_age"),
            FormStep::AwaitingEmail => write!(f, "awaiting_email"),
            FormStep::Complete => write!(f, "complete"),
        }
    }
}

/// Form fields in collection order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Age,
    Email,
}

impl std::fmt::Display for FormField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormField::Name => write!(f, "name"),
            FormField::Age => write!(f, "age"),
            FormField::Email => write!(f, "email"),
        }
    }
}

/// A value for one form field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Name(String),
    Age(i64),
    Email(String),
}

impl FieldValue {
    pub fn field(&self) -> FormField {
        match self {
            FieldValue::Name(_) => FormField::Name,
            FieldValue::Age(_) => FormField::Age,
            FieldValue::Email(_) => FormField::Email,
        }
    }
}

/// A user's in-progress registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: i64,
    pub step: FormStep,
    pub name: Option<String>,
    pub age: Option<i64>,
    pub email: Option<String>,
    pub started_at: DateTime<Utc>,
    /// When an abandoned session stops counting as active
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Create an empty session waiting for the user's name
    pub fn new(user_id: i64, ttl_seconds: u64) -> Self {
        let started_at = Utc::now();
        // a TTL too large to represent never expires
        let expires_at = (ttl_seconds > 0)
            .then(|| {
                i64::try_from(ttl_seconds)
                    .ok()
                    .and_then(Duration::try_seconds)
                    .and_then(|ttl| started_at.checked_add_signed(ttl))
            })
            .flatten();

        Self {
            user_id,
            step: FormStep::AwaitingName,
            name: None,
            age: None,
            email: None,
            started_at,
            expires_at,
        }
    }

    /// Check if the session has outlived its TTL
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }

    /// Fill the field the current step expects and advance
    ///
    /// A value for any other field is rejected and leaves the session unchanged.
    pub fn apply(&mut self, value: FieldValue) -> Result<FormStep> {
        let expected = self.step.expected_field();
        if expected != Some(value.field()) {
            return Err(BotError::InvalidStateTransition {
                from: self.step.to_string(),
                to: value.field().to_string(),
            });
        }

        match value {
            FieldValue::Name(name) => self.name = Some(name),
            FieldValue::Age(age) => self.age = Some(age),
            FieldValue::Email(email) => self.email = Some(email),
        }
        self.step = self.step.next();
        Ok(self.step)
    }

    /// The collected answers, available once every step is done
    pub fn completed_record(&self) -> Option<RegistrationRecord> {
        if self.step != FormStep::Complete {
            return None;
        }

        Some(RegistrationRecord {
            name: self.name.clone(),
            age: self.age,
            email: self.email.clone(),
        })
    }
}

/// The answers written to the tabular store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    pub name: Option<String>,
    pub age: Option<i64>,
    pub email: Option<String>,
}

impl RegistrationRecord {
    /// Row cells in column order; missing fields become empty strings
    pub fn to_row(&self) -> Vec<serde_json::Value> {
        vec![
            serde_json::Value::from(self.name.clone().unwrap_or_default()),
            self.age.map_or_else(|| serde_json::Value::from(""), serde_json::Value::from),
            serde_json::Value::from(self.email.clone().unwrap_or_default()),
        ]
    }
}
