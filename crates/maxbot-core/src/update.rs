//! Inbound updates.
//!
//! An [`Update`] is one event delivered by the platform, either pushed to a
//! webhook or pulled from the `GET /updates` endpoint. Apart from the
//! `update_type` discriminant and the `timestamp`, the record is kept opaque:
//! every other field is preserved as raw JSON so handlers can read whatever
//! the platform sends without this crate modelling it.
//!
//! ```rust,ignore
//! let update: Update = serde_json::from_str(body)?;
//! if update.update_type() == update_type::MESSAGE_CREATED {
//!     println!("text: {:?}", update.message_text());
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Well-known update type names.
pub mod update_type {
    /// A new message was posted.
    pub const MESSAGE_CREATED: &str = "message_created";
    /// An inline keyboard button was pressed.
    pub const MESSAGE_CALLBACK: &str = "message_callback";
    /// A message was edited.
    pub const MESSAGE_EDITED: &str = "message_edited";
    /// A message was removed.
    pub const MESSAGE_REMOVED: &str = "message_removed";
    /// A user pressed "Start" in a dialog with the bot.
    pub const BOT_STARTED: &str = "bot_started";
    /// The bot was added to a chat.
    pub const BOT_ADDED: &str = "bot_added";
    /// The bot was removed from a chat.
    pub const BOT_REMOVED: &str = "bot_removed";
    /// A user joined a chat the bot is a member of.
    pub const USER_ADDED: &str = "user_added";
    /// A user left a chat the bot is a member of.
    pub const USER_REMOVED: &str = "user_removed";
    /// The chat title changed.
    pub const CHAT_TITLE_CHANGED: &str = "chat_title_changed";
    /// Event key matching any update type without a dedicated handler.
    pub const WILDCARD: &str = "*";
}

/// One inbound event from the messaging platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    /// Discriminant such as `message_created` or `bot_started`.
    pub update_type: String,
    /// Platform timestamp of the event, in milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Every other field of the record, untouched.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Update {
    /// Creates an update with no extra fields.
    pub fn new(update_type: impl Into<String>, timestamp: i64) -> Self {
        Self {
            update_type: update_type.into(),
            timestamp,
            fields: Map::new(),
        }
    }

    /// Adds a top-level field (builder style, mostly useful in tests).
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Decodes an update from a JSON value.
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    /// Returns the update type.
    pub fn update_type(&self) -> &str {
        &self.update_type
    }

    /// Returns the platform timestamp.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Looks up a nested field by a dotted path, e.g. `"message.body.text"`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.fields.get(segments.next()?)?;
        for segment in segments {
            current = current.get(segment)?;
        }
        Some(current)
    }

    fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    fn get_i64(&self, path: &str) -> Option<i64> {
        self.get(path).and_then(Value::as_i64)
    }

    /// Text of the message body, if this update carries a message.
    pub fn message_text(&self) -> Option<&str> {
        self.get_str("message.body.text")
    }

    /// Identifier of the carried message.
    pub fn message_id(&self) -> Option<&str> {
        self.get_str("message.body.mid")
    }

    /// Chat the update belongs to.
    pub fn chat_id(&self) -> Option<i64> {
        self.get_i64("message.recipient.chat_id")
            .or_else(|| self.get_i64("chat_id"))
    }

    /// Payload string attached to the pressed callback button.
    pub fn callback_payload(&self) -> Option<&str> {
        self.get_str("callback.payload")
    }

    /// Identifier to answer the callback with.
    pub fn callback_id(&self) -> Option<&str> {
        self.get_str("callback.callback_id")
    }

    /// Deep-link payload of a `bot_started` update.
    pub fn start_payload(&self) -> Option<&str> {
        self.get_str("payload")
    }

    /// Infers which user a reply to this update should go to.
    ///
    /// Sources are tried in order: the message sender, the callback sender,
    /// an explicit `user` object, the partner of a dialog chat and finally a
    /// bare `user_id` field.
    pub fn recipient(&self) -> Option<i64> {
        const SOURCES: [&str; 6] = [
            "message.sender.user_id",
            "callback.sender.user_id",
            "callback.user.user_id",
            "user.user_id",
            "chat.dialog_with_user.user_id",
            "user_id",
        ];
        SOURCES.iter().find_map(|path| self.get_i64(path))
    }

    /// Re-serialises the update into a single JSON value.
    pub fn to_value(&self) -> Value {
        let mut map = self.fields.clone();
        map.insert("update_type".into(), Value::from(self.update_type.clone()));
        map.insert("timestamp".into(), Value::from(self.timestamp));
        Value::Object(map)
    }
}
