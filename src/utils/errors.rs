//! Error handling for RegBot
//!
//! This module defines the main error types used throughout the application.
//! Handlers never turn errors into user text themselves: every error travels
//! up to `handlers::replies`, which is the only place that renders them.

use thiserror::Error;

/// Main error type for RegBot application
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Telegram API error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Completion API error: {0}")]
    Completion(#[from] CompletionError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] SheetsError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No active session for user {user_id}")]
    SessionNotFound { user_id: i64 },

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// User input rejected by the registration form
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Age must be a whole number, got {input:?}")]
    AgeNotNumeric { input: String },
}

/// Completion API specific errors
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Completion request timed out")]
    Timeout,

    #[error("Completion request failed: {0}")]
    RequestFailed(String),

    #[error("Completion API returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid completion response: {0}")]
    InvalidResponse(String),

    #[error("Completion API returned no text")]
    EmptyResponse,
}

/// Google Sheets specific errors
#[derive(Error, Debug)]
pub enum SheetsError {
    #[error("Service account credentials invalid: {0}")]
    Credentials(String),

    #[error("Google authentication failed: {0}")]
    Auth(String),

    #[error("Spreadsheet not found: {0}")]
    SpreadsheetNotFound(String),

    #[error("Google Sheets API error: {0}")]
    Api(String),

    #[error("Google API request failed: {0}")]
    Http(String),
}

/// Result type alias for RegBot operations
pub type Result<T> = std::result::Result<T, BotError>;

/// Result type alias for completion API operations
pub type CompletionResult<T> = std::result::Result<T, CompletionError>;

/// Result type alias for Google Sheets operations
pub type SheetsResult<T> = std::result::Result<T, SheetsError>;

impl BotError {
    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            BotError::Telegram(_) => true,
            BotError::Validation(_) => true,
            BotError::Completion(_) => true,
            BotError::Persistence(_) => true,
            BotError::Config(_) => false,
            BotError::SessionNotFound { .. } => true,
            BotError::InvalidStateTransition { .. } => false,
            BotError::Redis(_) => true,
            BotError::Serialization(_) => false,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            BotError::Config(_) => ErrorSeverity::Critical,
            BotError::Validation(_) => ErrorSeverity::Info,
            BotError::SessionNotFound { .. } => ErrorSeverity::Warning,
            BotError::Completion(_) => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
