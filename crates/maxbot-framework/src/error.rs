//! Error types for the MaxBot framework.

use thiserror::Error;

/// Errors raised while building a [`Registry`](crate::Registry).
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// A command or action pattern is not a valid regular expression.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The pattern as registered.
        pattern: String,
        /// Why it failed to compile.
        reason: String,
    },
}

impl RegistryError {
    /// Creates an invalid pattern error.
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for registration operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
