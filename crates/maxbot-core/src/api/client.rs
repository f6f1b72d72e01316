//! Convenience surface over the platform REST API.
//!
//! Every method is a thin delegation to [`ApiCaller::call`]; the only logic
//! here is argument shaping (query vs. body) and unwrapping of
//! `{ "message": {...} }` envelopes on send.
//!
//! ```rust,ignore
//! let api = MaxApi::new(Arc::new(HttpApiCaller::new(&config)?));
//! let me = api.get_my_info().await?;
//! api.send_message_to_chat(chat_id, "Hello!", None).await?;
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use super::caller::{ApiCaller, HttpMethod, Query};
use crate::error::{ApiError, ApiResult};
use crate::update::Update;

/// Command metadata shown in the platform UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotCommand {
    /// Command name without the leading slash.
    pub name: String,
    /// Short description.
    pub description: String,
}

impl BotCommand {
    /// Creates command metadata.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Chat actions shown to other participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatAction {
    TypingOn,
    SendingPhoto,
    SendingVideo,
    SendingAudio,
    SendingFile,
    MarkSeen,
}

/// Response of `GET /updates`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBatch {
    /// Raw update records, decoded individually by the caller.
    #[serde(default)]
    pub updates: Vec<Value>,
    /// Server-side marker for the next page, if provided.
    #[serde(default)]
    pub marker: Option<i64>,
}

/// Cheaply clonable client for the platform API.
#[derive(Clone)]
pub struct MaxApi {
    caller: Arc<dyn ApiCaller>,
}

impl std::fmt::Debug for MaxApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaxApi").finish_non_exhaustive()
    }
}

impl MaxApi {
    /// Creates a client over the given caller.
    pub fn new(caller: Arc<dyn ApiCaller>) -> Self {
        Self { caller }
    }

    /// Performs a raw API call.
    pub async fn call(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<Value>,
        query: Query,
    ) -> ApiResult<Value> {
        debug!(method = %method, endpoint = %endpoint, "Calling MAX API");
        self.caller.call(method, endpoint, body, query).await
    }

    async fn get(&self, endpoint: &str, query: Query) -> ApiResult<Value> {
        self.call(HttpMethod::Get, endpoint, None, query).await
    }

    // =========================================================================
    // Bot info
    // =========================================================================

    /// `GET /me`
    pub async fn get_my_info(&self) -> ApiResult<Value> {
        self.get("me", Query::new()).await
    }

    /// `PATCH /me`
    pub async fn edit_my_info(&self, data: Value) -> ApiResult<Value> {
        self.call(HttpMethod::Patch, "me", Some(data), Query::new())
            .await
    }

    /// Declares the command list shown by the platform UI.
    pub async fn set_my_commands(&self, commands: &[BotCommand]) -> ApiResult<Value> {
        self.edit_my_info(json!({ "commands": commands })).await
    }

    /// Clears the command list.
    pub async fn delete_my_commands(&self) -> ApiResult<Value> {
        self.set_my_commands(&[]).await
    }

    // =========================================================================
    // Chats
    // =========================================================================

    /// `GET /chats`, paginated with `count` and `marker`.
    pub async fn get_all_chats(&self, count: Option<u32>, marker: Option<i64>) -> ApiResult<Value> {
        let query = Query::new()
            .with_opt("count", count)
            .with_opt("marker", marker);
        self.get("chats", query).await
    }

    /// `GET /chats/{chat_id}`
    pub async fn get_chat(&self, chat_id: i64) -> ApiResult<Value> {
        self.get(&format!("chats/{chat_id}"), Query::new()).await
    }

    /// `GET /chats/{link}` for a public chat link.
    pub async fn get_chat_by_link(&self, link: &str) -> ApiResult<Value> {
        self.get(&format!("chats/{link}"), Query::new()).await
    }

    /// `PATCH /chats/{chat_id}`
    pub async fn edit_chat_info(&self, chat_id: i64, data: Value) -> ApiResult<Value> {
        self.call(
            HttpMethod::Patch,
            &format!("chats/{chat_id}"),
            Some(data),
            Query::new(),
        )
        .await
    }

    /// `POST /chats/{chat_id}/actions`
    pub async fn send_action(&self, chat_id: i64, action: ChatAction) -> ApiResult<Value> {
        self.call(
            HttpMethod::Post,
            &format!("chats/{chat_id}/actions"),
            Some(json!({ "action": action })),
            Query::new(),
        )
        .await
    }

    /// `GET /chats/{chat_id}/pin`
    pub async fn get_pinned_message(&self, chat_id: i64) -> ApiResult<Value> {
        self.get(&format!("chats/{chat_id}/pin"), Query::new()).await
    }

    /// `PUT /chats/{chat_id}/pin`
    pub async fn pin_message(
        &self,
        chat_id: i64,
        message_id: &str,
        extra: Option<Value>,
    ) -> ApiResult<Value> {
        let mut body = object(extra);
        body.insert("message_id".into(), Value::from(message_id));
        self.call(
            HttpMethod::Put,
            &format!("chats/{chat_id}/pin"),
            Some(Value::Object(body)),
            Query::new(),
        )
        .await
    }

    /// `DELETE /chats/{chat_id}/pin`
    pub async fn unpin_message(&self, chat_id: i64) -> ApiResult<Value> {
        self.call(
            HttpMethod::Delete,
            &format!("chats/{chat_id}/pin"),
            None,
            Query::new(),
        )
        .await
    }

    // =========================================================================
    // Members
    // =========================================================================

    /// `GET /chats/{chat_id}/members/me`
    pub async fn get_chat_membership(&self, chat_id: i64) -> ApiResult<Value> {
        self.get(&format!("chats/{chat_id}/members/me"), Query::new())
            .await
    }

    /// `GET /chats/{chat_id}/members/admins`
    pub async fn get_chat_admins(&self, chat_id: i64) -> ApiResult<Value> {
        self.get(&format!("chats/{chat_id}/members/admins"), Query::new())
            .await
    }

    /// `POST /chats/{chat_id}/members`
    pub async fn add_chat_members(&self, chat_id: i64, user_ids: &[i64]) -> ApiResult<Value> {
        self.call(
            HttpMethod::Post,
            &format!("chats/{chat_id}/members"),
            Some(json!({ "user_ids": user_ids })),
            Query::new(),
        )
        .await
    }

    /// `GET /chats/{chat_id}/members`, optionally restricted to `user_ids`.
    pub async fn get_chat_members(
        &self,
        chat_id: i64,
        user_ids: &[i64],
        count: Option<u32>,
        marker: Option<i64>,
    ) -> ApiResult<Value> {
        let query = Query::new()
            .with_list("user_ids", user_ids)
            .with_opt("count", count)
            .with_opt("marker", marker);
        self.get(&format!("chats/{chat_id}/members"), query).await
    }

    /// `DELETE /chats/{chat_id}/members?user_id=`
    pub async fn remove_chat_member(&self, chat_id: i64, user_id: i64) -> ApiResult<Value> {
        self.call(
            HttpMethod::Delete,
            &format!("chats/{chat_id}/members"),
            None,
            Query::new().with("user_id", user_id),
        )
        .await
    }

    /// `DELETE /chats/{chat_id}/members/me`
    pub async fn leave_chat(&self, chat_id: i64) -> ApiResult<Value> {
        self.call(
            HttpMethod::Delete,
            &format!("chats/{chat_id}/members/me"),
            None,
            Query::new(),
        )
        .await
    }

    // =========================================================================
    // Messages
    // =========================================================================

    /// Sends a message into a chat.
    ///
    /// `extra` is merged into the body (`attachments`, `format`, ...), except
    /// `disable_link_preview`, which the platform expects in the query.
    pub async fn send_message_to_chat(
        &self,
        chat_id: i64,
        text: &str,
        extra: Option<Value>,
    ) -> ApiResult<Value> {
        self.post_message(Query::new().with("chat_id", chat_id), text, extra)
            .await
    }

    /// Sends a direct message to a user.
    pub async fn send_message_to_user(
        &self,
        user_id: i64,
        text: &str,
        extra: Option<Value>,
    ) -> ApiResult<Value> {
        self.post_message(Query::new().with("user_id", user_id), text, extra)
            .await
    }

    /// Replies to whoever caused `update`.
    ///
    /// Fails with [`ApiError::RecipientUnresolved`] when the update names no
    /// user (see [`Update::recipient`]).
    pub async fn send_message(
        &self,
        update: &Update,
        text: &str,
        extra: Option<Value>,
    ) -> ApiResult<Value> {
        let user_id = update.recipient().ok_or(ApiError::RecipientUnresolved)?;
        self.send_message_to_user(user_id, text, extra).await
    }

    async fn post_message(
        &self,
        mut query: Query,
        text: &str,
        extra: Option<Value>,
    ) -> ApiResult<Value> {
        let mut body = object(extra);
        if let Some(flag) = body.remove("disable_link_preview") {
            query.push("disable_link_preview", flag_value(&flag));
        }
        body.insert("text".into(), Value::from(text));

        let mut response = self
            .call(HttpMethod::Post, "messages", Some(Value::Object(body)), query)
            .await?;
        Ok(match response.get_mut("message") {
            Some(message) => message.take(),
            None => response,
        })
    }

    /// `GET /messages` for a chat, optionally restricted to `message_ids`.
    pub async fn get_messages(
        &self,
        chat_id: i64,
        message_ids: &[&str],
        count: Option<u32>,
    ) -> ApiResult<Value> {
        let query = Query::new()
            .with("chat_id", chat_id)
            .with_list("message_ids", message_ids)
            .with_opt("count", count);
        self.get("messages", query).await
    }

    /// `GET /messages/{message_id}`
    pub async fn get_message(&self, message_id: &str) -> ApiResult<Value> {
        self.get(&format!("messages/{message_id}"), Query::new())
            .await
    }

    /// `PUT /messages?message_id=`
    pub async fn edit_message(&self, message_id: &str, data: Value) -> ApiResult<Value> {
        self.call(
            HttpMethod::Put,
            "messages",
            Some(data),
            Query::new().with("message_id", message_id),
        )
        .await
    }

    /// `DELETE /messages?message_id=`
    pub async fn delete_message(&self, message_id: &str) -> ApiResult<Value> {
        self.call(
            HttpMethod::Delete,
            "messages",
            None,
            Query::new().with("message_id", message_id),
        )
        .await
    }

    /// `POST /answers?callback_id=`
    pub async fn answer_on_callback(&self, callback_id: &str, data: Value) -> ApiResult<Value> {
        self.call(
            HttpMethod::Post,
            "answers",
            Some(data),
            Query::new().with("callback_id", callback_id),
        )
        .await
    }

    // =========================================================================
    // Updates
    // =========================================================================

    /// `GET /updates` restricted to `types`, continuing after `marker`.
    pub async fn get_updates(&self, types: &[String], marker: Option<i64>) -> ApiResult<UpdateBatch> {
        let query = Query::new()
            .with_list("types", types)
            .with_opt("marker", marker);
        let response = self.get("updates", query).await?;
        Ok(serde_json::from_value(response)?)
    }
}

fn object(extra: Option<Value>) -> Map<String, Value> {
    match extra {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

fn flag_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
