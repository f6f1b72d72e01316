//! Inline keyboard builders.
//!
//! ```rust,ignore
//! let keyboard = InlineKeyboard::new()
//!     .row([Button::callback("Red", "color:red"), Button::callback("Blue", "color:blue")])
//!     .row([Button::link("Docs", "https://dev.max.ru/")]);
//!
//! api.send_message(&update, "Pick a color", Some(json!({
//!     "attachments": [keyboard.into_attachment()]
//! }))).await?;
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Visual intent of a callback button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Default,
    Positive,
    Negative,
}

/// One inline keyboard button.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Button {
    /// Sends a `message_callback` update carrying `payload` when pressed.
    Callback {
        text: String,
        payload: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        intent: Option<Intent>,
    },
    /// Opens a URL.
    Link { text: String, url: String },
    /// Asks the user to share their contact.
    RequestContact { text: String },
    /// Asks the user to share their location.
    RequestGeoLocation {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        quick: Option<bool>,
    },
    /// Creates a new chat with the bot.
    Chat {
        text: String,
        chat_title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        chat_description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start_payload: Option<String>,
    },
}

impl Button {
    /// Creates a callback button.
    pub fn callback(text: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::Callback {
            text: text.into(),
            payload: payload.into(),
            intent: None,
        }
    }

    /// Creates a link button.
    pub fn link(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Link {
            text: text.into(),
            url: url.into(),
        }
    }

    /// Creates a contact request button.
    pub fn request_contact(text: impl Into<String>) -> Self {
        Self::RequestContact { text: text.into() }
    }

    /// Creates a location request button.
    pub fn request_geo_location(text: impl Into<String>) -> Self {
        Self::RequestGeoLocation {
            text: text.into(),
            quick: None,
        }
    }

    /// Creates a chat creation button.
    pub fn chat(text: impl Into<String>, chat_title: impl Into<String>) -> Self {
        Self::Chat {
            text: text.into(),
            chat_title: chat_title.into(),
            chat_description: None,
            start_payload: None,
        }
    }

    /// Sets the intent of a callback button. Other buttons are unchanged.
    pub fn intent(mut self, value: Intent) -> Self {
        if let Self::Callback { intent, .. } = &mut self {
            *intent = Some(value);
        }
        self
    }

    /// Sends the location without confirmation. Only affects location buttons.
    pub fn quick(mut self, value: bool) -> Self {
        if let Self::RequestGeoLocation { quick, .. } = &mut self {
            *quick = Some(value);
        }
        self
    }

    /// Sets the start payload of a chat button. Other buttons are unchanged.
    pub fn start_payload(mut self, value: impl Into<String>) -> Self {
        if let Self::Chat { start_payload, .. } = &mut self {
            *start_payload = Some(value.into());
        }
        self
    }
}

/// Rows of inline buttons.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InlineKeyboard {
    pub buttons: Vec<Vec<Button>>,
}

impl InlineKeyboard {
    /// Creates an empty keyboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a row of buttons.
    pub fn row(mut self, row: impl IntoIterator<Item = Button>) -> Self {
        self.buttons.push(row.into_iter().collect());
        self
    }

    /// Appends several rows.
    pub fn rows(mut self, rows: impl IntoIterator<Item = Vec<Button>>) -> Self {
        self.buttons.extend(rows);
        self
    }

    /// Builds the message attachment understood by the platform.
    pub fn into_attachment(self) -> Value {
        json!({
            "type": "inline_keyboard",
            "payload": { "buttons": self.buttons },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_shape() {
        let attachment = InlineKeyboard::new()
            .row([
                Button::callback("Yes", "answer:yes").intent(Intent::Positive),
                Button::callback("No", "answer:no"),
            ])
            .row([Button::link("Docs", "https://dev.max.ru/")])
            .into_attachment();

        assert_eq!(
            attachment,
            json!({
                "type": "inline_keyboard",
                "payload": { "buttons": [
                    [
                        { "type": "callback", "text": "Yes", "payload": "answer:yes", "intent": "positive" },
                        { "type": "callback", "text": "No", "payload": "answer:no" }
                    ],
                    [ { "type": "link", "text": "Docs", "url": "https://dev.max.ru/" } ]
                ] }
            })
        );
    }

    #[test]
    fn test_modifiers_only_touch_matching_kind() {
        let link = Button::link("a", "b").intent(Intent::Negative).quick(true);
        assert_eq!(link, Button::link("a", "b"));

        let chat = Button::chat("New", "Support").start_payload("ref-1");
        assert_eq!(
            serde_json::to_value(chat).unwrap(),
            json!({ "type": "chat", "text": "New", "chat_title": "Support", "start_payload": "ref-1" })
        );

        let geo = Button::request_geo_location("Where?").quick(true);
        assert_eq!(
            serde_json::to_value(geo).unwrap(),
            json!({ "type": "request_geo_location", "text": "Where?", "quick": true })
        );
    }
}
