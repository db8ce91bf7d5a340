//! RegBot Telegram Bot
//!
//! A small Telegram bot that walks users through a three-step registration
//! form (name, age, email), appends each completed registration to a Google
//! Sheet, and answers every other message with a chat completion model.

#![allow(non_snake_case)]

pub mod config;
pub mod handlers;
pub mod services;
pub mod state;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{BotError, Result};

// Re-export main components for easy access
pub use handlers::{dispatch, Inbound, Outcome};
pub use services::ServiceFactory;
pub use state::{MemorySessionStore, SessionStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
