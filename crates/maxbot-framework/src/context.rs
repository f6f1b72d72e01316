//! Per-dispatch context.
//!
//! A [`Context`] is created for every dispatched update and handed to the
//! matched handler. It carries the update explicitly instead of parking it in
//! process-wide state, so reply helpers always address the update that is
//! actually being handled.

use std::sync::Arc;

use serde_json::Value;

use maxbot_core::{ApiError, ApiResult, MaxApi, Update};

/// The update being dispatched together with the API client.
#[derive(Debug, Clone)]
pub struct Context {
    update: Arc<Update>,
    api: MaxApi,
}

impl Context {
    /// Creates a context for one dispatch.
    pub fn new(update: Arc<Update>, api: MaxApi) -> Self {
        Self { update, api }
    }

    /// Returns the update.
    pub fn update(&self) -> &Update {
        &self.update
    }

    /// Returns a shared handle to the update.
    pub fn update_arc(&self) -> Arc<Update> {
        Arc::clone(&self.update)
    }

    /// Returns the API client.
    pub fn api(&self) -> &MaxApi {
        &self.api
    }

    /// Sends `text` to the user who caused the update.
    pub async fn reply(&self, text: &str) -> ApiResult<Value> {
        self.api.send_message(&self.update, text, None).await
    }

    /// Sends `text` with extra body fields such as attachments.
    pub async fn reply_with(&self, text: &str, extra: Value) -> ApiResult<Value> {
        self.api.send_message(&self.update, text, Some(extra)).await
    }

    /// Answers the callback carried by the update.
    ///
    /// An update without a callback id fails with [`ApiError::Protocol`]
    /// before any request is made.
    pub async fn answer(&self, data: Value) -> ApiResult<Value> {
        let callback_id = self
            .update
            .callback_id()
            .ok_or_else(|| ApiError::protocol("answers", "update carries no callback_id"))?;
        self.api.answer_on_callback(callback_id, data).await
    }
}
