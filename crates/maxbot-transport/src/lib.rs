//! # MaxBot Transport
//!
//! Network implementations of the seams defined in `maxbot-core`.
//!
//! ## Features
//!
//! - `http-client` (default): [`HttpApiCaller`], a reqwest-backed `ApiCaller`
//! - `http-server` (default): [`WebhookServer`], an axum server feeding a `PayloadHandler`
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  maxbot-runtime     │  (polling, push delivery, bootstrap)
//! ├─────────────────────┤
//! │  maxbot-core        │  (ApiCaller / PayloadHandler traits)
//! ├─────────────────────┤
//! │  maxbot-transport   │  <- This crate (implementations)
//! ├─────────────────────┤
//! │  Network (HTTP)     │
//! └─────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use maxbot_transport::HttpApiCaller;
//! use maxbot_core::MaxApi;
//!
//! let api = MaxApi::new(Arc::new(HttpApiCaller::new(token)?));
//! let me = api.get_my_info().await?;
//! ```
//!
//! ```rust,ignore
//! use maxbot_transport::WebhookServer;
//!
//! let server = WebhookServer::bind("0.0.0.0:8080", "/", handler).await?;
//! server.serve(cancel).await?;
//! ```

#[cfg(any(feature = "http-client", feature = "http-server"))]
pub mod http;

#[cfg(feature = "http-client")]
pub use http::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT, HttpApiCaller};

#[cfg(feature = "http-server")]
pub use http::{WebhookServer, webhook_router};
