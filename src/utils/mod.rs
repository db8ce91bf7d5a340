//! Utility modules
//!
//! This module contains common utilities used throughout the application:
//! error handling and logging setup.

pub mod errors;
pub mod logging;

pub use errors::{BotError, Result};
