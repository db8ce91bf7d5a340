//! Command handlers module
//!
//! This module contains handlers for the bot commands, /start and /cancel,
//! plus the reply to commands the bot does not know.

use teloxide::utils::command::BotCommands;
use tracing::debug;
use crate::services::ServiceFactory;
use crate::utils::errors::Result;
use super::Outcome;

/// All available bot commands
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "RegBot commands:")]
pub enum Command {
    #[command(description = "Start registration")]
    Start,
    #[command(description = "Cancel registration")]
    Cancel,
}

/// Handle /start - reset the user's session and ask for their name
pub async fn handle_start(services: &ServiceFactory, user_id: i64) -> Result<Outcome> {
    services.registration.start(user_id).await?;
    Ok(Outcome::RegistrationStarted)
}

/// Handle /cancel - drop the user's session, if any
pub async fn handle_cancel(services: &ServiceFactory, user_id: i64) -> Result<Outcome> {
    services.registration.cancel(user_id).await?;
    Ok(Outcome::RegistrationCancelled)
}

/// Handle any other command; commands never reach the assistant
pub async fn handle_unknown_command(services: &ServiceFactory, user_id: i64, name: &str) -> Result<Outcome> {
    debug!(user_id = user_id, command = name, "Unknown command");

    if services.sessions().is_active(user_id).await? {
        Ok(Outcome::FinishRegistrationFirst)
    } else {
        Ok(Outcome::Help)
    }
}
