//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{BotError, Result};
use super::{Settings, SessionBackend};

/// Longest session TTL accepted, ten years
pub const MAX_SESSION_TTL_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_bot_config(&settings.bot)?;
    validate_openai_config(&settings.openai)?;
    validate_google_config(&settings.google)?;
    validate_session_config(&settings.session)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

/// Validate bot configuration
fn validate_bot_config(config: &super::BotConfig) -> Result<()> {
    if config.token.is_empty() {
        return Err(BotError::Config(
            "Bot token is required".to_string()
        ));
    }

    Ok(())
}

/// Validate completion API configuration
fn validate_openai_config(config: &super::OpenAiConfig) -> Result<()> {
    if config.api_key.is_empty() {
        return Err(BotError::Config(
            "OpenAI API key is required".to_string()
        ));
    }

    if config.api_url.is_empty() {
        return Err(BotError::Config(
            "OpenAI API URL is required".to_string()
        ));
    }

    if config.model.is_empty() {
        return Err(BotError::Config(
            "OpenAI model is required".to_string()
        ));
    }

    if config.max_tokens == 0 {
        return Err(BotError::Config(
            "OpenAI max_tokens must be greater than 0".to_string()
        ));
    }

    if config.timeout_seconds == 0 {
        return Err(BotError::Config(
            "OpenAI timeout must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate Google Sheets configuration
fn validate_google_config(config: &super::GoogleConfig) -> Result<()> {
    if config.service_account_path.is_empty() {
        return Err(BotError::Config(
            "Google service account path is required".to_string()
        ));
    }

    let has_id = config.spreadsheet_id.as_deref().is_some_and(|id| !id.is_empty());
    if !has_id && config.spreadsheet_name.is_empty() {
        return Err(BotError::Config(
            "Either a spreadsheet name or a spreadsheet ID is required".to_string()
        ));
    }

    if config.timeout_seconds == 0 {
        return Err(BotError::Config(
            "Google API timeout must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate session store configuration
fn validate_session_config(config: &super::SessionConfig) -> Result<()> {
    if config.backend == SessionBackend::Redis
        && config.redis_url.as_deref().map_or(true, str::is_empty)
    {
        return Err(BotError::Config(
            "Redis URL is required for the redis session backend".to_string()
        ));
    }

    if config.ttl_seconds > MAX_SESSION_TTL_SECONDS {
        return Err(BotError::Config(
            format!(
                "Session TTL {} exceeds the maximum of {} seconds",
                config.ttl_seconds, MAX_SESSION_TTL_SECONDS
            )
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(BotError::Config(
            "Log level is required".to_string()
        ));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(BotError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    Ok(())
}
