//! # MaxBot Core
//!
//! Shared building blocks of the MaxBot framework:
//!
//! - **Updates**: the inbound event record ([`Update`])
//! - **Errors**: the API, handler and webhook error taxonomy ([`ApiError`], [`HandlerError`], [`WebhookError`])
//! - **Replies**: what handlers hand back to the delivery loop ([`Reply`], [`IntoReply`])
//! - **API client**: the transport seam ([`ApiCaller`]) and the convenience surface over it ([`MaxApi`])
//! - **Keyboards**: inline button builders ([`InlineKeyboard`], [`Button`])
//!
//! ```text
//! ┌──────────────┐     ┌────────────┐     ┌───────────┐     ┌────────────┐
//! │ Delivery loop│────▶│ Dispatcher │────▶│  Handler  │────▶│   MaxApi   │
//! │ (poll / push)│     │            │     │           │     │ (ApiCaller)│
//! └──────────────┘     └────────────┘     └───────────┘     └────────────┘
//! ```

pub mod api;
pub mod error;
pub mod ingress;
pub mod keyboard;
pub mod reply;
pub mod update;

pub use api::{ApiCaller, BotCommand, ChatAction, HttpMethod, MaxApi, Query, UpdateBatch};
pub use error::{ApiError, ApiResult, HandlerError, HandlerResult, WebhookError};
pub use ingress::{BoxedPayloadHandler, PayloadHandler};
pub use keyboard::{Button, InlineKeyboard, Intent};
pub use reply::{IntoReply, Reply};
pub use update::{Update, update_type};
