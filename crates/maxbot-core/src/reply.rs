//! Handler return values.
//!
//! Whatever a handler returns is carried back to the delivery loop unchanged,
//! for logging in polling mode or as the response body in webhook mode.

use serde_json::Value;

use crate::error::{HandlerError, HandlerResult};

/// The value a handler produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Reply {
    /// Nothing to report.
    #[default]
    Empty,
    /// Plain text.
    Text(String),
    /// A JSON document, typically an API response.
    Json(Value),
}

impl Reply {
    /// Returns `true` for [`Reply::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Renders the reply as a response body.
    pub fn to_body(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(text) => text.clone(),
            Self::Json(value) => value.to_string(),
        }
    }
}

impl std::fmt::Display for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("--NO RESPONSE--"),
            Self::Text(text) => f.write_str(text),
            Self::Json(value) => match serde_json::to_string_pretty(value) {
                Ok(pretty) => f.write_str(&pretty),
                Err(_) => write!(f, "{value}"),
            },
        }
    }
}

/// Conversion of handler outputs into a [`Reply`].
pub trait IntoReply: Send {
    /// Converts `self`, surfacing handler failures as errors.
    fn into_reply(self) -> HandlerResult<Reply>;
}

impl IntoReply for () {
    fn into_reply(self) -> HandlerResult<Reply> {
        Ok(Reply::Empty)
    }
}

impl IntoReply for Reply {
    fn into_reply(self) -> HandlerResult<Reply> {
        Ok(self)
    }
}

impl IntoReply for String {
    fn into_reply(self) -> HandlerResult<Reply> {
        Ok(Reply::Text(self))
    }
}

impl IntoReply for &'static str {
    fn into_reply(self) -> HandlerResult<Reply> {
        Ok(Reply::Text(self.to_string()))
    }
}

impl IntoReply for Value {
    fn into_reply(self) -> HandlerResult<Reply> {
        Ok(match self {
            Value::Null => Reply::Empty,
            other => Reply::Json(other),
        })
    }
}

impl<T: IntoReply> IntoReply for Option<T> {
    fn into_reply(self) -> HandlerResult<Reply> {
        match self {
            Some(inner) => inner.into_reply(),
            None => Ok(Reply::Empty),
        }
    }
}

impl<T, E> IntoReply for Result<T, E>
where
    T: IntoReply,
    E: Into<HandlerError> + Send,
{
    fn into_reply(self) -> HandlerResult<Reply> {
        self.map_err(Into::into)?.into_reply()
    }
}
