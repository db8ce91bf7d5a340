//! Registration form service
//!
//! Drives a session through name, age and email. The email step hands the
//! finished record to the record sink and ends the session whether or not
//! the append succeeded.

use std::sync::Arc;
use tracing::{debug, info, warn};
use crate::services::sheets::RecordSink;
use crate::state::{FieldValue, FormStep, RegistrationRecord, Session, SessionStore};
use crate::utils::errors::{BotError, Result, ValidationError};
use crate::utils::logging::{log_api_error, log_registration, log_user_action};

/// What an accepted answer led to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormProgress {
    NameAccepted,
    AgeAccepted,
    Registered(RegistrationRecord),
}

/// Registration form controller
#[derive(Clone)]
pub struct RegistrationService {
    sessions: Arc<dyn SessionStore>,
    sink: Arc<dyn RecordSink>,
}

impl RegistrationService {
    /// Create a new RegistrationService instance
    pub fn new(sessions: Arc<dyn SessionStore>, sink: Arc<dyn RecordSink>) -> Self {
        Self { sessions, sink }
    }

    /// Session store the form reads and writes
    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Start (or restart) the form, discarding any answers given so far
    pub async fn start(&self, user_id: i64) -> Result<Session> {
        let session = self.sessions.begin(user_id).await?;
        log_user_action(user_id, "registration_started", None);
        Ok(session)
    }

    /// Abandon the form without storing anything
    pub async fn cancel(&self, user_id: i64) -> Result<()> {
        self.sessions.end(user_id).await?;
        log_user_action(user_id, "registration_cancelled", None);
        Ok(())
    }

    /// Feed one message to the step the session is waiting on
    pub async fn handle_input(&self, session: &Session, text: &str) -> Result<FormProgress> {
        let user_id = session.user_id;
        debug!(user_id = user_id, step = %session.step, "Handling registration input");

        match session.step {
            FormStep::AwaitingName => {
                self.sessions.set_field(user_id, FieldValue::Name(text.to_string())).await?;
                Ok(FormProgress::NameAccepted)
            }
            FormStep::AwaitingAge => {
                let age = parse_age(text)?;
                self.sessions.set_field(user_id, FieldValue::Age(age)).await?;
                Ok(FormProgress::AgeAccepted)
            }
            FormStep::AwaitingEmail => {
                let completed = self.sessions.set_field(user_id, FieldValue::Email(text.to_string())).await?;
                self.finish(completed).await
            }
            FormStep::Complete => {
                self.sessions.end(user_id).await?;
                Err(BotError::InvalidStateTransition {
                    from: FormStep::Complete.to_string(),
                    to: "input".to_string(),
                })
            }
        }
    }

    async fn finish(&self, session: Session) -> Result<FormProgress> {
        let user_id = session.user_id;
        let record = session.completed_record().ok_or_else(|| BotError::InvalidStateTransition {
            from: session.step.to_string(),
            to: FormStep::Complete.to_string(),
        })?;

        let stored = self.sink.append_record(&record).await;
        if let Err(e) = self.sessions.end(user_id).await {
            warn!(user_id = user_id, error = %e, "Failed to end session after final answer");
        }

        match stored {
            Ok(()) => {
                log_registration(user_id, true);
                info!(user_id = user_id, "Registration completed");
                Ok(FormProgress::Registered(record))
            }
            Err(e) => {
                log_registration(user_id, false);
                log_api_error("google_sheets", &e.to_string(), Some("append registration row"));
                Err(e.into())
            }
        }
    }
}

/// Parse an age answer as a whole number
///
/// Arabic-Indic, Persian and full-width digits count as digits, and single
/// underscores may separate digit groups (`1_000`).
pub fn parse_age(text: &str) -> std::result::Result<i64, ValidationError> {
    let rejected = || ValidationError::AgeNotNumeric {
        input: text.to_string(),
    };

    let normalized: String = text.trim().chars().map(ascii_digit).collect();
    let digits = normalized.strip_prefix(|c| c == '+' || c == '-').unwrap_or(&normalized);
    if digits.starts_with('_') || digits.ends_with('_') || digits.contains("__") {
        return Err(rejected());
    }

    normalized.replace('_', "").parse::<i64>().map_err(|_| rejected())
}

/// Map a non-ASCII decimal digit to its ASCII form, leaving other chars alone
fn ascii_digit(c: char) -> char {
    let zero = match c {
        '\u{0660}'..='\u{0669}' => '\u{0660}',
        '\u{06F0}'..='\u{06F9}' => '\u{06F0}',
        '\u{FF10}'..='\u{FF19}' => '\u{FF10}',
        _ => return c,
    };
    char::from(b'0' + (c as u32 - zero as u32) as u8)
}
