//! # MaxBot
//!
//! A bot framework for the MAX messenger platform.
//!
//! ## Overview
//!
//! Register handlers for slash commands, update types and inline-button
//! callbacks, then let the runtime deliver updates to them either by long
//! polling or through a webhook.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────────┐     ┌──────────┐     ┌───────────┐
//! │ Poller /     │────▶│ Dispatcher │────▶│ Registry │────▶│ Handler   │──▶ MaxApi
//! │ PushDelivery │     │ (staleness │     │ actions  │     │ (async fn │
//! └──────────────┘     │  + match)  │     │ commands │     │  or text) │
//!                      └────────────┘     │ events   │     └───────────┘
//!                                         └──────────┘
//! ```
//!
//! - **Runtime**: configuration, logging, polling and webhook delivery
//! - **Dispatcher**: drops stale updates and picks one handler per update
//! - **Registry**: commands, events and callback actions
//! - **Handlers**: async functions taking extractors such as [`Param`](prelude::Param)
//!   and [`Context`](prelude::Context), or a canned text reply
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use maxbot::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     MaxBot::from_env()?
//!         .command("start", "Welcome!")
//!         .command("echo", |param: Param| async move {
//!             format!("You said: {}", param.text())
//!         })
//!         .action("color:(.+)", |param: Param, ctx: Context| async move {
//!             let color = param.group(1).unwrap_or_default().to_string();
//!             ctx.answer(json!({ "notification": color })).await
//!         })?
//!         .start_polling(Vec::new())
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` (default): read `maxbot.toml`
//! - `yaml-config`: read `maxbot.yaml`
//! - `json-log`: JSON log output

pub use maxbot_core as core;
pub use maxbot_framework as framework;
pub use maxbot_runtime as runtime;
pub use maxbot_transport as transport;

pub use tokio_util::sync::CancellationToken;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use maxbot::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use maxbot_runtime::{ConfigLoader, MaxBot, MaxBotConfig, StartupError};

    // Registration and handler extractors
    pub use maxbot_framework::{Context, Handler, Param, Registry, RegistryError};

    // Updates, replies and the API client
    pub use maxbot_core::{
        ApiError, BotCommand, HandlerError, HandlerResult, MaxApi, Reply, Update, update_type,
    };

    // Keyboards
    pub use maxbot_core::{Button, InlineKeyboard, Intent};

    pub use serde_json::json;
    pub use tokio_util::sync::CancellationToken;
}
