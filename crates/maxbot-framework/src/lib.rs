//! # MaxBot Framework
//!
//! Routing layer of the MaxBot framework.
//!
//! This layer provides:
//! - [`Registry`] of commands, events and callback actions
//! - [`Handler`] conversions for async functions and canned text replies
//! - [`Context`] handed to each handler with the update and the API client
//! - [`Dispatcher`] that picks the handler for an update and runs it
//!
//! Delivery (polling, webhooks) lives in `maxbot-runtime`; this crate only
//! decides what an update means.

pub mod context;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod registry;

pub use context::Context;
pub use dispatcher::{DEFAULT_STALENESS, Dispatched, Dispatcher, MatchKind, Route};
pub use error::{RegistryError, RegistryResult};
pub use handler::{BoxedCallback, Call, FromCall, Handler, IntoHandler, Param};
pub use registry::{ActionEntry, CommandEntry, CommandPattern, EVENT_SEPARATOR, Registry};
