//! The request/response seam between the API client and the network.
//!
//! [`MaxApi`](super::MaxApi) builds requests and interprets results; an
//! [`ApiCaller`] moves them over the wire. The production implementation is
//! `HttpApiCaller` in `maxbot-transport`; tests substitute a recording double.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ApiResult;

/// HTTP verbs used by the platform API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Returns the verb as sent on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Whether a JSON body is transmitted with this verb.
    pub fn carries_body(self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered query string parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query(Vec<(String, String)>);

impl Query {
    /// Creates an empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter.
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.push(key, value);
        self
    }

    /// Appends a parameter when `value` is present.
    pub fn with_opt<V: ToString>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.push(key, value);
        }
        self
    }

    /// Appends a comma-joined list, skipping empty lists.
    pub fn with_list<V: ToString>(mut self, key: impl Into<String>, values: &[V]) -> Self {
        if !values.is_empty() {
            let joined = values
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            self.push(key, joined);
        }
        self
    }

    /// Appends a parameter in place.
    pub fn push(&mut self, key: impl Into<String>, value: impl ToString) {
        self.0.push((key.into(), value.to_string()));
    }

    /// Returns the value of the first parameter named `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns `true` if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(key, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Transport-specific API call mechanism.
///
/// Implementations perform exactly one HTTP exchange per call and classify
/// failures into [`ApiError`](crate::ApiError) variants. They never retry.
#[async_trait]
pub trait ApiCaller: Send + Sync {
    /// Performs one API request.
    ///
    /// # Arguments
    /// * `method` – HTTP verb.
    /// * `endpoint` – Path relative to the API base URL, e.g. `"messages"`.
    /// * `body` – JSON body, only transmitted for POST/PUT/PATCH.
    /// * `query` – Query string parameters.
    async fn call(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<Value>,
        query: Query,
    ) -> ApiResult<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_lists_are_comma_joined() {
        let query = Query::new()
            .with("chat_id", 5)
            .with_list("message_ids", &["a", "b", "c"])
            .with_list::<i64>("user_ids", &[]);
        assert_eq!(query.get("chat_id"), Some("5"));
        assert_eq!(query.get("message_ids"), Some("a,b,c"));
        assert_eq!(query.get("user_ids"), None);
    }

    #[test]
    fn test_body_verbs() {
        assert!(HttpMethod::Patch.carries_body());
        assert!(!HttpMethod::Get.carries_body());
        assert!(!HttpMethod::Delete.carries_body());
    }
}
