//! MaxBot Runtime - delivery and bootstrap for the MaxBot framework.
//!
//! This crate provides:
//! - Configuration loading and validation (`ConfigLoader`, `MaxBotConfig`)
//! - Logging configuration (`LoggingBuilder`)
//! - Pull delivery over long polling (`Poller`)
//! - Push delivery behind the webhook server (`PushDelivery`)
//! - The `MaxBot` builder that wires them together
//!
//! ```rust,ignore
//! use maxbot_runtime::MaxBot;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let bot = MaxBot::from_env()?.command("start", "Hello!");
//!
//!     // Run until Ctrl+C
//!     bot.start_polling(Vec::new()).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Delivery loop
//!
//! Each polling iteration fetches one batch after the current cursor,
//! dispatches the updates in order and advances the cursor to the newest
//! timestamp seen, then sleeps for the idle delay (1 s). A failed fetch, or a
//! batch where a handler failed, sleeps for the error backoff (5 s) instead.
//! Updates older than the staleness window (120 s) are skipped without
//! running a handler.

pub mod bot;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod poller;
pub mod push;

// Re-exports
pub use bot::MaxBot;
pub use clock::{Clock, SystemClock};
pub use config::{ConfigError, ConfigLoader, ConfigResult, MaxBotConfig};
pub use error::{StartupError, StartupResult};
pub use logging::LoggingBuilder;
pub use poller::{IterationOutcome, PollCursor, Poller};
pub use push::PushDelivery;

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}
