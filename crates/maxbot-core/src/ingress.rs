//! Receiving side of webhook delivery.
//!
//! The HTTP server in `maxbot-transport` knows nothing about dispatching; it
//! hands each POST body to a [`PayloadHandler`] and renders the outcome.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::WebhookError;
use crate::reply::Reply;

/// Processes one pushed update body.
#[async_trait]
pub trait PayloadHandler: Send + Sync {
    /// Decodes `body`, dispatches it and returns the handler's reply.
    async fn on_payload(&self, body: &[u8]) -> Result<Reply, WebhookError>;
}

/// Type-erased payload handler.
pub type BoxedPayloadHandler = Arc<dyn PayloadHandler>;
