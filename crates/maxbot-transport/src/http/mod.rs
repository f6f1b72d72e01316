//! HTTP transport.
//!
//! This module provides the API caller and the webhook server.

#[cfg(feature = "http-client")]
mod client;
#[cfg(feature = "http-client")]
pub use client::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT, HttpApiCaller};

#[cfg(feature = "http-server")]
mod server;
#[cfg(feature = "http-server")]
pub use server::{WebhookServer, webhook_router};
