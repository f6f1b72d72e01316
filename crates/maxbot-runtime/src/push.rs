//! Push (webhook) delivery.
//!
//! One pushed payload produces exactly one dispatch. The payload is either
//! supplied already decoded or read from the raw request body; anything that
//! does not decode to an update is a [`WebhookError::MalformedPayload`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use maxbot_core::{MaxApi, PayloadHandler, Reply, Update, WebhookError};
use maxbot_framework::{Dispatched, Dispatcher};

use crate::clock::{Clock, SystemClock};

/// Dispatches pushed updates.
#[derive(Clone)]
pub struct PushDelivery {
    api: MaxApi,
    dispatcher: Dispatcher,
    clock: Arc<dyn Clock>,
    verbose: bool,
}

impl std::fmt::Debug for PushDelivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushDelivery")
            .field("dispatcher", &self.dispatcher)
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

impl PushDelivery {
    /// Creates a push delivery using the system clock.
    pub fn new(api: MaxApi, dispatcher: Dispatcher) -> Self {
        Self {
            api,
            dispatcher,
            clock: Arc::new(SystemClock),
            verbose: false,
        }
    }

    /// Replaces the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Logs every update and its reply at `info` when enabled.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Handles one pushed update.
    ///
    /// `data` takes precedence when it is present and not empty; otherwise
    /// `body` is decoded as JSON. Stale and unmatched updates produce an
    /// empty reply.
    pub async fn handle_payload(&self, data: Option<Value>, body: &[u8]) -> Result<Reply, WebhookError> {
        let value = match data.filter(|value| !is_empty_payload(value)) {
            Some(value) => value,
            None => serde_json::from_slice::<Value>(body)
                .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?,
        };
        if is_empty_payload(&value) {
            return Err(WebhookError::MalformedPayload("empty payload".to_string()));
        }

        let update = Update::from_value(value)
            .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;
        let update = Arc::new(update);

        let outcome = self
            .dispatcher
            .dispatch(Arc::clone(&update), &self.api, self.clock.now_ms())
            .await?;

        if self.verbose {
            info!(
                update_type = %update.update_type(),
                timestamp = update.timestamp(),
                ?outcome,
                "Processed pushed update"
            );
        } else {
            debug!(update_type = %update.update_type(), ?outcome, "Processed pushed update");
        }

        Ok(match outcome {
            Dispatched::Handled(reply) => reply,
            Dispatched::Stale | Dispatched::Unmatched => Reply::Empty,
        })
    }
}

fn is_empty_payload(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[async_trait]
impl PayloadHandler for PushDelivery {
    async fn on_payload(&self, body: &[u8]) -> Result<Reply, WebhookError> {
        self.handle_payload(None, body).await
    }
}
