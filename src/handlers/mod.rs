//! Bot handlers module
//!
//! Every inbound update is reduced to an [`Inbound`], dispatched to the
//! registration form or the assistant, and the resulting [`Outcome`] (or
//! error) is rendered into a single reply by [`replies`].

pub mod commands;
pub mod messages;
pub mod replies;

use teloxide::{Bot, types::Message, prelude::*};
use tracing::{debug, error, info, warn};
use crate::services::{FormProgress, ServiceFactory};
use crate::state::RegistrationRecord;
use crate::utils::errors::{BotError, ErrorSeverity, Result};

pub use commands::Command;

/// An inbound message reduced to what the bot routes on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Start,
    Cancel,
    /// Any `/command` the bot does not know, without the slash
    UnknownCommand(String),
    Text(String),
}

impl Inbound {
    /// Classify raw message text
    ///
    /// A command addressed to another bot (`/start@OtherBot`) is not one of
    /// ours and comes back as [`Inbound::UnknownCommand`].
    pub fn from_text(text: &str, bot_username: &str) -> Self {
        let Some(command) = text.strip_prefix('/') else {
            return Inbound::Text(text.to_string());
        };

        let token = command.split_whitespace().next().unwrap_or_default().to_lowercase();
        let (name, mention) = match token.split_once('@') {
            Some((name, mention)) => (name, Some(mention)),
            None => (token.as_str(), None),
        };

        if mention.is_some_and(|m| !m.eq_ignore_ascii_case(bot_username)) {
            return Inbound::UnknownCommand(token.clone());
        }

        match name {
            "start" => Inbound::Start,
            "cancel" => Inbound::Cancel,
            _ => Inbound::UnknownCommand(name.to_string()),
        }
    }
}

impl From<Command> for Inbound {
    fn from(cmd: Command) -> Self {
        match cmd {
            Command::Start => Inbound::Start,
            Command::Cancel => Inbound::Cancel,
        }
    }
}

/// What handling an inbound message produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    RegistrationStarted,
    NameAccepted,
    AgeAccepted,
    Registered(RegistrationRecord),
    RegistrationCancelled,
    /// Completion text to relay verbatim
    Answer(String),
    FinishRegistrationFirst,
    Help,
}

impl From<FormProgress> for Outcome {
    fn from(progress: FormProgress) -> Self {
        match progress {
            FormProgress::NameAccepted => Outcome::NameAccepted,
            FormProgress::AgeAccepted => Outcome::AgeAccepted,
            FormProgress::Registered(record) => Outcome::Registered(record),
        }
    }
}

/// Route an inbound message for a user
pub async fn dispatch(services: &ServiceFactory, user_id: i64, inbound: Inbound) -> Result<Outcome> {
    debug!(user_id = user_id, inbound = ?inbound, "Dispatching message");

    match inbound {
        Inbound::Start => commands::handle_start(services, user_id).await,
        Inbound::Cancel => commands::handle_cancel(services, user_id).await,
        Inbound::UnknownCommand(name) => commands::handle_unknown_command(services, user_id, &name).await,
        Inbound::Text(text) => messages::handle_text(services, user_id, &text).await,
    }
}

/// Handle a Telegram message end to end and send exactly one reply
pub async fn handle_update(bot: &Bot, msg: &Message, inbound: Inbound, services: &ServiceFactory) -> Result<()> {
    let user = msg.from.as_ref().ok_or_else(|| BotError::InvalidStateTransition {
        from: "anonymous_message".to_string(),
        to: "dispatch".to_string(),
    })?;
    let user_id = user.id.0 as i64;

    let result = dispatch(services, user_id, inbound).await;
    if let Err(e) = &result {
        log_handler_error(user_id, e);
    }

    let text = replies::render(&result);
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

fn log_handler_error(user_id: i64, e: &BotError) {
    match e.severity() {
        ErrorSeverity::Info => info!(user_id = user_id, error = %e, "Input rejected"),
        ErrorSeverity::Warning => warn!(user_id = user_id, error = %e, "Request failed"),
        severity => error!(user_id = user_id, error = %e, severity = %severity, "Error handling message"),
    }
}
