//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;

/// Faults that stop the bot before any update is dispatched.
#[derive(Error, Debug)]
pub enum StartupError {
    /// No bot token was configured.
    #[error("Bot token is required: set MAXBOT_TOKEN or BOT_TOKEN, or `token` in maxbot.toml")]
    MissingToken,

    /// The configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The HTTP client could not be built.
    #[error("Failed to create API client: {0}")]
    Client(String),

    /// The webhook listener could not be bound or failed while serving.
    #[error("Webhook server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for startup operations.
pub type StartupResult<T> = Result<T, StartupError>;
