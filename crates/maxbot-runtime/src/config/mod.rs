//! Configuration module for the MaxBot runtime.
//!
//! This module provides figment-based configuration loading and validation
//! for the token, API client, delivery loops and logging.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, ENV_PREFIX, TOKEN_ENV};
pub use schema::{
    ApiConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, MaxBotConfig, PollingConfig,
    WebhookConfig,
};
pub use validation::validate_config;
