//! reqwest-backed [`ApiCaller`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Method, StatusCode, Url, header};
use serde_json::Value;
use tracing::{debug, trace, warn};

use maxbot_core::{ApiCaller, ApiError, ApiResult, HttpMethod, Query};

/// Default platform API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://platform-api.max.ru";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Calls the platform REST API over HTTPS.
///
/// Every request carries the bot token in the `Authorization` header. Bodies
/// are sent as JSON for `POST`, `PUT` and `PATCH` only. Responses are
/// classified as follows:
///
/// | Outcome | Error |
/// |---------|-------|
/// | request could not be sent | [`ApiError::Transport`] |
/// | HTTP 401 | [`ApiError::Unauthorized`] |
/// | body is not JSON | [`ApiError::Protocol`] |
/// | HTTP status 400 or above | [`ApiError::Api`] |
///
/// An empty successful body decodes to `null`.
#[derive(Debug, Clone)]
pub struct HttpApiCaller {
    client: Client,
    base_url: Url,
    token: String,
}

impl HttpApiCaller {
    /// Creates a caller for the default endpoint and timeout.
    pub fn new(token: impl Into<String>) -> ApiResult<Self> {
        Self::with_options(token, DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    /// Creates a caller for a custom endpoint and timeout.
    pub fn with_options(
        token: impl Into<String>,
        base_url: &str,
        timeout: Duration,
    ) -> ApiResult<Self> {
        let base_url =
            Url::parse(base_url).map_err(|e| ApiError::transport(base_url, e.to_string()))?;
        let client = ClientBuilder::new()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::transport(base_url.as_str(), e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            token: token.into(),
        })
    }

    /// Returns the base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, endpoint: &str, query: &Query) -> ApiResult<Url> {
        let mut url = self
            .base_url
            .join(endpoint.trim_start_matches('/'))
            .map_err(|e| ApiError::transport(endpoint, e.to_string()))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter());
        }
        Ok(url)
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

/// Turns a status and raw body into the decoded value or a classified error.
fn classify(endpoint: &str, status: StatusCode, body: &[u8]) -> ApiResult<Value> {
    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized {
            endpoint: endpoint.to_string(),
        });
    }

    let value = if body.iter().all(u8::is_ascii_whitespace) && status.is_success() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(body).map_err(|e| {
            ApiError::protocol(endpoint, format!("HTTP {}: {e}", status.as_u16()))
        })?
    };

    if status.as_u16() >= 400 {
        let field = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_string);
        return Err(ApiError::Api {
            status: status.as_u16(),
            code: field("code").unwrap_or_default(),
            description: field("message").unwrap_or_else(|| "Unknown error".to_string()),
        });
    }

    Ok(value)
}

#[async_trait]
impl ApiCaller for HttpApiCaller {
    async fn call(
        &self,
        http_method: HttpMethod,
        endpoint: &str,
        body: Option<Value>,
        query: Query,
    ) -> ApiResult<Value> {
        let url = self.url(endpoint, &query)?;
        trace!(method = %http_method, url = %url, "Sending API request");

        let mut request = self
            .client
            .request(method(http_method), url)
            .header(header::AUTHORIZATION, &self.token);
        if http_method.carries_body() {
            request = request.json(&body.unwrap_or_else(|| Value::Object(Default::default())));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::transport(endpoint, e.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::transport(endpoint, e.to_string()))?;

        debug!(method = %http_method, endpoint, status = status.as_u16(), "API call finished");

        let result = classify(endpoint, status, &bytes);
        if let Err(e) = &result {
            warn!(method = %http_method, endpoint, error = %e, "API call failed");
        }
        result
    }
}
