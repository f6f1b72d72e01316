//! Unified error types for the MaxBot core.
//!
//! This module provides the error taxonomy shared across crates. Startup and
//! configuration errors live in `maxbot-runtime`.

use thiserror::Error;

// =============================================================================
// API Errors
// =============================================================================

/// Errors returned by platform API calls.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response (DNS, TLS, connect, timeout).
    #[error("transport error calling {endpoint}: {reason}")]
    Transport {
        /// Endpoint that was being called.
        endpoint: String,
        /// Underlying failure.
        reason: String,
    },

    /// The response body was not valid JSON.
    #[error("invalid JSON response from {endpoint}: {reason}")]
    Protocol {
        /// Endpoint that was being called.
        endpoint: String,
        /// Decoder message.
        reason: String,
    },

    /// The platform rejected the bot token (HTTP 401).
    #[error("unauthorized: invalid or missing token (endpoint {endpoint})")]
    Unauthorized {
        /// Endpoint that was being called.
        endpoint: String,
    },

    /// The platform answered with an error status.
    #[error("API error ({status} {code}): {description}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Platform error code, e.g. `chat.not.found`.
        code: String,
        /// Human readable description.
        description: String,
    },

    /// `send_message` could not infer who to reply to.
    #[error("unable to determine recipient for message")]
    RecipientUnresolved,

    /// A request or response body could not be (de)serialised.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ApiError {
    /// Creates a transport error.
    pub fn transport(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Creates a protocol error.
    pub fn protocol(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Protocol {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for failures that say nothing about the request itself
    /// and may succeed when retried.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::Protocol { .. } => true,
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Returns the platform error code for [`ApiError::Api`].
    pub fn api_code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

// =============================================================================
// Handler Errors
// =============================================================================

/// Errors a handler may fail with.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// An API call made by the handler failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Any other failure.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    /// Wraps an arbitrary error.
    pub fn other<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Other(err.into())
    }

    /// Creates an error from a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Other(message.into().into())
    }
}

// =============================================================================
// Webhook Errors
// =============================================================================

/// Errors produced while serving a pushed update.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The request did not use POST.
    #[error("Access not allowed!")]
    MethodNotAllowed,

    /// The body was not a decodable update.
    #[error("Invalid JSON in webhook request: {0}")]
    MalformedPayload(String),

    /// The matched handler failed.
    #[error(transparent)]
    Handler(#[from] HandlerError),
}

impl WebhookError {
    /// HTTP status the webhook endpoint answers with for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MethodNotAllowed | Self::MalformedPayload(_) => 400,
            Self::Handler(_) => 500,
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type for handlers.
pub type HandlerResult<T> = Result<T, HandlerError>;
