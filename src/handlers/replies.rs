//! Reply formatting
//!
//! The only place outcomes and errors turn into user-facing text. Replies
//! are in Persian, the language the bot serves.

use teloxide::utils::command::BotCommands;
use crate::utils::errors::{BotError, Result};
use super::{Command, Outcome};

pub const WELCOME_ASK_NAME: &str =
    "👋 سلام! به ربات هوشمند ثبت‌نام خوش آمدید.\nلطفاً نام و نام خانوادگی خود را وارد کنید:";
pub const NAME_SAVED_ASK_AGE: &str = "✅ نام ذخیره شد. لطفاً سن خود را وارد کنید:";
pub const AGE_SAVED_ASK_EMAIL: &str = "✅ سن ذخیره شد. لطفاً ایمیل خود را وارد کنید:";
pub const AGE_NOT_NUMERIC: &str = "❌ سن باید یک عدد باشد. لطفاً دوباره وارد کنید:";
pub const REGISTERED: &str = "🎉 اطلاعات شما با موفقیت در سیستم ثبت شد!";
pub const RECEIVED_NOT_STORED: &str = "✅ اطلاعات شما دریافت شد! (خطای ذخیره سازی)";
pub const CANCELLED: &str = "❌ عملیات ثبت‌نام لغو شد.";
pub const FINISH_REGISTRATION: &str = "لطفاً فرآیند ثبت‌نام را تکمیل کنید.";
pub const APOLOGY: &str = "⚡ متأسفانه در حال حاضر قادر به پاسخگویی نیستم.";

/// Render the result of handling a message as reply text
pub fn render(result: &Result<Outcome>) -> String {
    match result {
        Ok(outcome) => render_outcome(outcome),
        Err(e) => render_error(e).to_string(),
    }
}

fn render_outcome(outcome: &Outcome) -> String {
    match outcome {
        Outcome::RegistrationStarted => WELCOME_ASK_NAME.to_string(),
        Outcome::NameAccepted => NAME_SAVED_ASK_AGE.to_string(),
        Outcome::AgeAccepted => AGE_SAVED_ASK_EMAIL.to_string(),
        Outcome::Registered(_) => REGISTERED.to_string(),
        Outcome::RegistrationCancelled => CANCELLED.to_string(),
        Outcome::Answer(text) => text.clone(),
        Outcome::FinishRegistrationFirst => FINISH_REGISTRATION.to_string(),
        Outcome::Help => Command::descriptions().to_string(),
    }
}

fn render_error(e: &BotError) -> &'static str {
    match e {
        BotError::Validation(_) => AGE_NOT_NUMERIC,
        BotError::Persistence(_) => RECEIVED_NOT_STORED,
        _ => APOLOGY,
    }
}
