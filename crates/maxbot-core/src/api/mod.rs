//! Platform API access.

mod caller;
mod client;

pub use caller::{ApiCaller, HttpMethod, Query};
pub use client::{BotCommand, ChatAction, MaxApi, UpdateBatch};
