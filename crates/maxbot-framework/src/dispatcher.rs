//! Update dispatcher for the MaxBot framework.
//!
//! The [`Dispatcher`] decides which registration, if any, handles an update
//! and what parameter it receives. The decision order is fixed and at most
//! one handler fires per update:
//!
//! 1. **Staleness**: updates older than the staleness window (120 seconds by
//!    default) are skipped.
//! 2. **Actions**: for `message_callback` updates, every action pattern is tried
//!    as a regex against the payload in registration order, then every pattern
//!    is compared to the payload as an exact string.
//! 3. **Commands**: for `message_created` updates whose text starts with `/`,
//!    command entries are tried in registration order.
//! 4. **Events**: the exact update type, falling back to `*`.
//!
//! Anything else is left unhandled without error.
//!
//! ```rust,ignore
//! let dispatcher = Dispatcher::new(registry);
//!
//! match dispatcher.dispatch(Arc::new(update), &api, clock.now_ms()).await? {
//!     Dispatched::Handled(reply) => println!("{reply}"),
//!     Dispatched::Stale | Dispatched::Unmatched => {}
//! }
//! ```
//!
//! [`Dispatcher::route`] exposes the decision without running anything, and
//! given the same update, registry and time it always returns the same route.

use std::sync::Arc;
use std::time::Duration;

use tracing::{Instrument, Level, debug, span, trace};

use maxbot_core::{HandlerResult, MaxApi, Reply, Update, update_type};

use crate::context::Context;
use crate::handler::{Call, Handler, Param};
use crate::registry::{Registry, capture_all};

/// Default age after which an update is skipped.
pub const DEFAULT_STALENESS: Duration = Duration::from_secs(120);

/// Which namespace produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// An action pattern matched as a regex.
    ActionRegex,
    /// An action pattern equalled the payload.
    ActionExact,
    /// A `/name` command.
    Command,
    /// A raw command regex.
    CommandRegex,
    /// An event registered for the exact update type.
    Event,
    /// The `*` event.
    Wildcard,
}

/// The outcome of classifying an update.
#[derive(Debug, Clone)]
pub enum Route<'r> {
    /// The update is older than the staleness window.
    Stale,
    /// No registration applies.
    Unmatched,
    /// A registration applies.
    Matched {
        /// The handler to run.
        handler: &'r Handler,
        /// The parameter it receives.
        param: Param,
        /// Where the match came from.
        kind: MatchKind,
    },
}

/// The outcome of dispatching an update.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    /// Skipped because it is too old.
    Stale,
    /// Nothing was registered for it.
    Unmatched,
    /// A handler ran and returned this reply.
    Handled(Reply),
}

impl Dispatched {
    /// Returns the reply if a handler ran.
    pub fn reply(&self) -> Option<&Reply> {
        match self {
            Self::Handled(reply) => Some(reply),
            Self::Stale | Self::Unmatched => None,
        }
    }
}

/// Routes updates to the handlers of a [`Registry`].
///
/// The dispatcher holds no per-update state; it is cheap to clone and safe to
/// share.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    staleness: Duration,
}

impl Dispatcher {
    /// Creates a dispatcher with the default staleness window.
    pub fn new(registry: Registry) -> Self {
        Self {
            registry: Arc::new(registry),
            staleness: DEFAULT_STALENESS,
        }
    }

    /// Sets the staleness window.
    pub fn with_staleness(mut self, staleness: Duration) -> Self {
        self.staleness = staleness;
        self
    }

    /// Returns the registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns the staleness window.
    pub fn staleness(&self) -> Duration {
        self.staleness
    }

    /// Returns `true` if `update` is older than the staleness window at `now_ms`.
    pub fn is_stale(&self, update: &Update, now_ms: i64) -> bool {
        let window = i64::try_from(self.staleness.as_millis()).unwrap_or(i64::MAX);
        update.timestamp() < now_ms.saturating_sub(window)
    }

    /// Classifies `update` at time `now_ms` (milliseconds since the epoch).
    pub fn route(&self, update: &Update, now_ms: i64) -> Route<'_> {
        if self.is_stale(update, now_ms) {
            return Route::Stale;
        }

        let kind = update.update_type();

        if kind == update_type::MESSAGE_CALLBACK && update.get("callback").is_some() {
            let payload = update.callback_payload().unwrap_or("");
            if let Some(route) = self.match_action(payload) {
                return route;
            }
        }

        if kind == update_type::MESSAGE_CREATED {
            let command = update
                .message_text()
                .filter(|text| text.starts_with('/'))
                .and_then(|text| self.match_command(text));
            if let Some(route) = command {
                return route;
            }
        }

        if !kind.is_empty() {
            if let Some(handler) = self.registry.event(kind) {
                return Route::Matched {
                    handler,
                    param: Param::Text(event_param(update).to_string()),
                    kind: MatchKind::Event,
                };
            }
            if let Some(handler) = self.registry.event(update_type::WILDCARD) {
                return Route::Matched {
                    handler,
                    param: Param::default(),
                    kind: MatchKind::Wildcard,
                };
            }
        }

        Route::Unmatched
    }

    fn match_action(&self, payload: &str) -> Option<Route<'_>> {
        let actions = self.registry.actions();

        let by_regex = actions.iter().find_map(|entry| {
            capture_all(&entry.regex, payload).map(|groups| Route::Matched {
                handler: &entry.handler,
                param: Param::Captures(groups),
                kind: MatchKind::ActionRegex,
            })
        });

        by_regex.or_else(|| {
            actions
                .iter()
                .find(|entry| entry.source == payload)
                .map(|entry| Route::Matched {
                    handler: &entry.handler,
                    param: Param::Text(payload.to_string()),
                    kind: MatchKind::ActionExact,
                })
        })
    }

    fn match_command(&self, text: &str) -> Option<Route<'_>> {
        use crate::registry::CommandPattern;

        self.registry.commands().iter().find_map(|entry| {
            let mut groups = entry.pattern.matches(text)?;
            let (param, kind) = match &entry.pattern {
                CommandPattern::Name(_) => (Param::Text(groups.pop().unwrap_or_default()), MatchKind::Command),
                CommandPattern::Raw(_) => (Param::Captures(groups), MatchKind::CommandRegex),
            };
            Some(Route::Matched {
                handler: &entry.handler,
                param,
                kind,
            })
        })
    }

    /// Routes `update` and runs the matched handler.
    ///
    /// A [`Handler::Respond`] registration sends its text to the update's
    /// recipient and yields the API response. Handler and API errors are
    /// returned to the caller.
    pub async fn dispatch(
        &self,
        update: Arc<Update>,
        api: &MaxApi,
        now_ms: i64,
    ) -> HandlerResult<Dispatched> {
        let span = span!(
            Level::DEBUG,
            "dispatch",
            update_type = %update.update_type(),
            timestamp = update.timestamp()
        );

        async move {
            let (handler, param) = match self.route(&update, now_ms) {
                Route::Stale => {
                    debug!("Skipping stale update");
                    return Ok(Dispatched::Stale);
                }
                Route::Unmatched => {
                    trace!("No handler registered");
                    return Ok(Dispatched::Unmatched);
                }
                Route::Matched {
                    handler,
                    param,
                    kind,
                } => {
                    debug!(?kind, ?param, "Matched handler");
                    (handler.clone(), param)
                }
            };

            let reply = match handler {
                Handler::Invoke(callback) => {
                    let call = Call {
                        ctx: Context::new(Arc::clone(&update), api.clone()),
                        param,
                    };
                    callback(call).await?
                }
                Handler::Respond(text) => Reply::Json(api.send_message(&update, &text, None).await?),
            };

            Ok(Dispatched::Handled(reply))
        }
        .instrument(span)
        .await
    }
}

/// Parameter handed to an exact event handler, by update type.
fn event_param(update: &Update) -> &str {
    match update.update_type() {
        update_type::MESSAGE_CREATED => update.message_text(),
        update_type::MESSAGE_CALLBACK => update.callback_payload(),
        update_type::BOT_STARTED => update.start_payload(),
        _ => None,
    }
    .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::RecordingCaller;
    use crate::error::RegistryResult;
    use maxbot_core::{HandlerError, update_type::*};
    use serde_json::json;
    use std::sync::Mutex;
    use tokio_test::assert_ok;

    const NOW: i64 = 1_700_000_000_000;

    fn message(text: &str, timestamp: i64) -> Update {
        Update::new(MESSAGE_CREATED, timestamp).with_field(
            "message",
            json!({ "sender": { "user_id": 7 }, "body": { "text": text } }),
        )
    }

    fn callback(payload: &str, timestamp: i64) -> Update {
        Update::new(MESSAGE_CALLBACK, timestamp).with_field(
            "callback",
            json!({ "payload": payload, "callback_id": "c1", "user": { "user_id": 7 } }),
        )
    }

    fn routed(dispatcher: &Dispatcher, update: &Update) -> Option<(Param, MatchKind)> {
        match dispatcher.route(update, NOW) {
            Route::Matched { param, kind, .. } => Some((param, kind)),
            Route::Stale | Route::Unmatched => None,
        }
    }

    fn full_registry() -> RegistryResult<Registry> {
        Ok(Registry::new()
            .command("start", "Welcome!")
            .command("echo", |param: Param| async move { param.text().to_string() })
            .regex(r"^/sum (\d+) (\d+)$", |param: Param| async move {
                param.captures().map(<[String]>::len).unwrap_or(0).to_string()
            })?
            .action("color:(.+)", "picked")?
            .on(MESSAGE_CREATED, "message")
            .on(BOT_STARTED, "started")
            .on(WILDCARD, "anything"))
    }

    #[test]
    fn test_stale_updates_are_skipped() {
        let dispatcher = Dispatcher::new(full_registry().unwrap());

        let old = NOW - 120_001;
        assert!(matches!(dispatcher.route(&message("/start", old), NOW), Route::Stale));
        assert!(matches!(dispatcher.route(&callback("color:red", old), NOW), Route::Stale));
        assert!(matches!(dispatcher.route(&Update::new("x", old), NOW), Route::Stale));

        let edge = NOW - 120_000;
        assert!(!dispatcher.is_stale(&message("/start", edge), NOW));
    }

    #[test]
    fn test_staleness_window_is_configurable() {
        let dispatcher = Dispatcher::new(Registry::new()).with_staleness(Duration::from_secs(5));
        assert!(dispatcher.is_stale(&Update::new("x", NOW - 5_001), NOW));
        assert!(!dispatcher.is_stale(&Update::new("x", NOW - 5_000), NOW));
    }

    #[test]
    fn test_command_parameters() {
        let dispatcher = Dispatcher::new(full_registry().unwrap());

        assert_eq!(
            routed(&dispatcher, &message("/echo hello", NOW)),
            Some((Param::Text("hello".into()), MatchKind::Command))
        );
        assert_eq!(
            routed(&dispatcher, &message("/echo", NOW)),
            Some((Param::Text(String::new()), MatchKind::Command))
        );
        assert_eq!(
            routed(&dispatcher, &message("/sum 2 3", NOW)),
            Some((
                Param::Captures(vec!["/sum 2 3".into(), "2".into(), "3".into()]),
                MatchKind::CommandRegex
            ))
        );
    }

    #[test]
    fn test_unknown_command_falls_back_to_event() {
        let dispatcher = Dispatcher::new(full_registry().unwrap());
        assert_eq!(
            routed(&dispatcher, &message("/unknown arg", NOW)),
            Some((Param::Text("/unknown arg".into()), MatchKind::Event))
        );
        assert_eq!(
            routed(&dispatcher, &message("plain text", NOW)),
            Some((Param::Text("plain text".into()), MatchKind::Event))
        );
    }

    #[test]
    fn test_first_command_registration_wins() {
        let registry = Registry::new().command("start", "one").command("start", "two");
        let dispatcher = Dispatcher::new(registry);

        match dispatcher.route(&message("/start", NOW), NOW) {
            Route::Matched { handler, .. } => {
                assert!(matches!(handler, Handler::Respond(text) if text == "one"));
            }
            other => panic!("unexpected route: {other:?}"),
        }
    }

    #[test]
    fn test_action_regex_captures() {
        let dispatcher = Dispatcher::new(full_registry().unwrap());
        assert_eq!(
            routed(&dispatcher, &callback("color:red", NOW)),
            Some((
                Param::Captures(vec!["color:red".into(), "red".into()]),
                MatchKind::ActionRegex
            ))
        );
    }

    #[test]
    fn test_action_regex_pass_precedes_exact_pass() {
        // "a+b" as a regex does not match the payload "a+b", only as a string.
        let registry = Registry::new()
            .action("a+b", "exact")
            .unwrap()
            .action(r"\+", "regex")
            .unwrap();
        let dispatcher = Dispatcher::new(registry);

        match dispatcher.route(&callback("a+b", NOW), NOW) {
            Route::Matched { handler, kind, .. } => {
                assert_eq!(kind, MatchKind::ActionRegex);
                assert!(matches!(handler, Handler::Respond(text) if text == "regex"));
            }
            other => panic!("unexpected route: {other:?}"),
        }
    }

    #[test]
    fn test_action_exact_fallback() {
        let registry = Registry::new().action("a+b", "exact").unwrap();
        let dispatcher = Dispatcher::new(registry);
        assert_eq!(
            routed(&dispatcher, &callback("a+b", NOW)),
            Some((Param::Text("a+b".into()), MatchKind::ActionExact))
        );
    }

    #[test]
    fn test_unmatched_callback_uses_event_payload() {
        let registry = Registry::new()
            .action("^ok$", "ok")
            .unwrap()
            .on(MESSAGE_CALLBACK, "event");
        let dispatcher = Dispatcher::new(registry);
        assert_eq!(
            routed(&dispatcher, &callback("nope", NOW)),
            Some((Param::Text("nope".into()), MatchKind::Event))
        );
    }

    #[test]
    fn test_event_parameters_by_type() {
        let dispatcher = Dispatcher::new(full_registry().unwrap());

        let started = Update::new(BOT_STARTED, NOW).with_field("payload", json!("ref-42"));
        assert_eq!(
            routed(&dispatcher, &started),
            Some((Param::Text("ref-42".into()), MatchKind::Event))
        );

        let bare = Update::new(BOT_STARTED, NOW);
        assert_eq!(
            routed(&dispatcher, &bare),
            Some((Param::Text(String::new()), MatchKind::Event))
        );
    }

    #[test]
    fn test_wildcard_always_gets_empty_parameter() {
        let dispatcher = Dispatcher::new(Registry::new().on(WILDCARD, "any"));

        for update in [
            message("hello", NOW),
            callback("color:red", NOW),
            Update::new(BOT_STARTED, NOW).with_field("payload", json!("ref")),
            Update::new(USER_ADDED, NOW),
        ] {
            assert_eq!(
                routed(&dispatcher, &update),
                Some((Param::default(), MatchKind::Wildcard))
            );
        }
    }

    #[test]
    fn test_empty_type_is_unmatched() {
        let dispatcher = Dispatcher::new(Registry::new().on(WILDCARD, "any"));
        assert!(matches!(dispatcher.route(&Update::new("", NOW), NOW), Route::Unmatched));
        let empty = Dispatcher::new(Registry::new());
        assert!(matches!(empty.route(&message("/start", NOW), NOW), Route::Unmatched));
    }

    #[test]
    fn test_second_event_registration_fires() {
        let dispatcher = Dispatcher::new(Registry::new().on(USER_ADDED, "first").on(USER_ADDED, "second"));

        match dispatcher.route(&Update::new(USER_ADDED, NOW), NOW) {
            Route::Matched { handler, .. } => {
                assert!(matches!(handler, Handler::Respond(text) if text == "second"));
            }
            other => panic!("unexpected route: {other:?}"),
        }
    }

    #[test]
    fn test_route_is_repeatable() {
        let dispatcher = Dispatcher::new(full_registry().unwrap());
        let update = callback("color:blue", NOW);
        assert_eq!(routed(&dispatcher, &update), routed(&dispatcher, &update));
    }

    #[tokio::test]
    async fn test_dispatch_start_command_end_to_end() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let registry = Registry::new().command("start", move |param: Param| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().unwrap().push(param);
            }
        });
        let dispatcher = Dispatcher::new(registry);
        let api = MaxApi::new(Arc::new(RecordingCaller::default()));

        let outcome = assert_ok!(dispatcher.dispatch(Arc::new(message("/start", NOW)), &api, NOW).await);

        assert_eq!(outcome, Dispatched::Handled(Reply::Empty));
        assert_eq!(*seen.lock().unwrap(), vec![Param::Text(String::new())]);
    }

    #[tokio::test]
    async fn test_dispatch_action_end_to_end() {
        let registry = Registry::new()
            .action("color:(.+)", |param: Param| async move {
                format!("picked {}", param.group(1).unwrap_or("?"))
            })
            .unwrap();
        let dispatcher = Dispatcher::new(registry);
        let api = MaxApi::new(Arc::new(RecordingCaller::default()));

        let outcome = dispatcher
            .dispatch(Arc::new(callback("color:red", NOW)), &api, NOW)
            .await
            .unwrap();

        assert_eq!(outcome.reply(), Some(&Reply::Text("picked red".into())));
    }

    #[tokio::test]
    async fn test_respond_sends_to_recipient() {
        let caller = Arc::new(RecordingCaller::default());
        let api = MaxApi::new(caller.clone());
        let dispatcher = Dispatcher::new(Registry::new().command("start", "Welcome!"));

        let outcome = dispatcher
            .dispatch(Arc::new(message("/start", NOW)), &api, NOW)
            .await
            .unwrap();

        assert_eq!(outcome, Dispatched::Handled(Reply::Json(json!({ "sent": true }))));
        let calls = caller.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, "messages");
        assert_eq!(calls[0].3.get("user_id"), Some("7"));
        assert_eq!(calls[0].2.as_ref().unwrap()["text"], "Welcome!");
    }

    #[tokio::test]
    async fn test_stale_dispatch_runs_nothing() {
        let caller = Arc::new(RecordingCaller::default());
        let api = MaxApi::new(caller.clone());
        let dispatcher = Dispatcher::new(Registry::new().on(WILDCARD, "any"));

        let outcome = dispatcher
            .dispatch(Arc::new(message("hi", NOW - 200_000)), &api, NOW)
            .await
            .unwrap();

        assert_eq!(outcome, Dispatched::Stale);
        assert!(caller.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_handler_error_propagates() {
        let registry = Registry::new().on(MESSAGE_CREATED, || async {
            Err::<(), _>(HandlerError::msg("boom"))
        });
        let dispatcher = Dispatcher::new(registry);
        let api = MaxApi::new(Arc::new(RecordingCaller::default()));

        let result = dispatcher.dispatch(Arc::new(message("hi", NOW)), &api, NOW).await;
        assert!(result.is_err());
    }
}
