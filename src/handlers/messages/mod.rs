//! Message handlers module
//!
//! Handles incoming text that is not a command: answers to the registration
//! form while a session is active, questions for the assistant otherwise.

use tracing::debug;
use crate::services::ServiceFactory;
use crate::utils::errors::Result;
use super::Outcome;

/// Handle incoming text messages
pub async fn handle_text(services: &ServiceFactory, user_id: i64, text: &str) -> Result<Outcome> {
    if let Some(session) = services.sessions().get(user_id).await? {
        debug!(user_id = user_id, step = %session.step, "Routing text to registration form");
        let progress = services.registration.handle_input(&session, text).await?;
        return Ok(progress.into());
    }

    debug!(user_id = user_id, "Routing text to assistant");
    let answer = services.assistant.answer(user_id, text).await?;
    Ok(Outcome::Answer(answer))
}
