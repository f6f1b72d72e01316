//! Long-poll delivery.
//!
//! The [`Poller`] repeatedly asks the platform for updates and dispatches them
//! one at a time, in the order received:
//!
//! 1. `GET /updates` with the configured type allow-list and, once the cursor
//!    is non-zero, `marker=<cursor>`.
//! 2. For every update: dispatch it, then advance the cursor to its
//!    timestamp. The cursor advances even when the update was stale or its
//!    handler failed.
//! 3. Sleep for the idle delay (1 s by default) and start over.
//!
//! A failed fetch is logged and followed by the error backoff (5 s by default).
//! A handler error is logged too and the rest of the batch still runs, but
//! the iteration then ends with the error backoff instead of the idle delay.
//! Nothing that happens inside an iteration stops the loop; only the
//! [`CancellationToken`] passed to [`Poller::run`] does.
//!
//! ```rust,ignore
//! let mut poller = Poller::new(api, dispatcher)
//!     .types(vec!["message_created".into(), "message_callback".into()]);
//!
//! let cancel = CancellationToken::new();
//! poller.run(cancel.child_token()).await;
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use maxbot_core::{ApiResult, MaxApi, Update, UpdateBatch};
use maxbot_framework::{Dispatched, Dispatcher};

use crate::clock::{Clock, SystemClock};
use crate::config::PollingConfig;

/// Timestamp watermark of the last processed update.
///
/// Lives only in memory; after a restart the platform redelivers from its own
/// retention window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollCursor(i64);

impl PollCursor {
    /// Returns the raw value.
    pub fn get(self) -> i64 {
        self.0
    }

    /// Moves the cursor to `timestamp` unless that would move it backwards.
    pub fn advance(&mut self, timestamp: i64) {
        self.0 = self.0.max(timestamp);
    }

    /// Returns the marker to send, or `None` while the cursor is still zero.
    pub fn marker(self) -> Option<i64> {
        (self.0 > 0).then_some(self.0)
    }
}

/// What one polling iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationOutcome {
    /// The batch was fetched and every update in it was handled.
    Processed {
        /// Updates in the batch.
        updates: usize,
        /// Updates whose handler returned an error.
        failed: usize,
    },
    /// Fetching the batch failed.
    Failed,
}

/// Pull-mode delivery loop.
pub struct Poller {
    api: MaxApi,
    dispatcher: Dispatcher,
    clock: Arc<dyn Clock>,
    types: Vec<String>,
    idle_delay: Duration,
    error_backoff: Duration,
    verbose: bool,
    cursor: PollCursor,
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("types", &self.types)
            .field("idle_delay", &self.idle_delay)
            .field("error_backoff", &self.error_backoff)
            .field("verbose", &self.verbose)
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}

impl Poller {
    /// Creates a poller with the default delays and the system clock.
    pub fn new(api: MaxApi, dispatcher: Dispatcher) -> Self {
        let defaults = PollingConfig::default();
        Self {
            api,
            dispatcher,
            clock: Arc::new(SystemClock),
            types: defaults.types.clone(),
            idle_delay: defaults.idle_delay(),
            error_backoff: defaults.error_backoff(),
            verbose: true,
            cursor: PollCursor::default(),
        }
    }

    /// Applies the allow-list and delays from `config`.
    pub fn with_config(mut self, config: &PollingConfig) -> Self {
        self.types.clone_from(&config.types);
        self.idle_delay = config.idle_delay();
        self.error_backoff = config.error_backoff();
        self
    }

    /// Replaces the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the update types requested from the platform; empty means all.
    pub fn types(mut self, types: Vec<String>) -> Self {
        self.types = types;
        self
    }

    /// Sets the pause after each processed batch.
    pub fn idle_delay(mut self, delay: Duration) -> Self {
        self.idle_delay = delay;
        self
    }

    /// Sets the pause after a failed iteration.
    pub fn error_backoff(mut self, delay: Duration) -> Self {
        self.error_backoff = delay;
        self
    }

    /// Logs every update and its reply at `info` when enabled.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Returns the cursor.
    pub fn cursor(&self) -> PollCursor {
        self.cursor
    }

    /// Runs until `cancel` fires.
    ///
    /// Cancellation is observed while waiting for a batch and while sleeping,
    /// never in the middle of a dispatch.
    pub async fn run(&mut self, cancel: CancellationToken) {
        info!(types = ?self.types, "Long polling started");

        loop {
            let fetched = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                fetched = self.fetch() => fetched,
            };

            let delay = match self.process(fetched).await {
                IterationOutcome::Processed { failed: 0, .. } => self.idle_delay,
                IterationOutcome::Processed { failed, .. } => {
                    warn!(failed, backoff = ?self.error_backoff, "Handlers failed, backing off");
                    self.error_backoff
                }
                IterationOutcome::Failed => self.error_backoff,
            };

            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = self.clock.sleep(delay) => {}
            }
        }

        info!(cursor = self.cursor.get(), "Long polling stopped");
    }

    /// Runs a single iteration without sleeping.
    pub async fn poll_once(&mut self) -> IterationOutcome {
        let fetched = self.fetch().await;
        self.process(fetched).await
    }

    async fn fetch(&self) -> ApiResult<UpdateBatch> {
        let marker = self.cursor.marker();
        trace!(?marker, "Requesting updates");
        self.api.get_updates(&self.types, marker).await
    }

    async fn process(&mut self, fetched: ApiResult<UpdateBatch>) -> IterationOutcome {
        let batch = match fetched {
            Ok(batch) => batch,
            Err(e) => {
                error!(error = %e, backoff = ?self.error_backoff, "Failed to fetch updates");
                return IterationOutcome::Failed;
            }
        };

        let updates = batch.updates.len();
        if updates > 0 {
            debug!(updates, server_marker = ?batch.marker, "Received updates");
        }

        let mut failed = 0;
        for raw in batch.updates {
            if !self.handle(raw).await {
                failed += 1;
            }
        }

        IterationOutcome::Processed { updates, failed }
    }

    /// Dispatches one raw update and advances the cursor. Returns `false` if
    /// its handler failed.
    async fn handle(&mut self, raw: Value) -> bool {
        let update = match Update::from_value(raw) {
            Ok(update) => Arc::new(update),
            Err(e) => {
                warn!(error = %e, "Skipping undecodable update");
                return true;
            }
        };

        let now_ms = self.clock.now_ms();
        let result = self
            .dispatcher
            .dispatch(Arc::clone(&update), &self.api, now_ms)
            .await;
        self.cursor.advance(update.timestamp());

        match result {
            Ok(outcome) => {
                self.report(&update, &outcome);
                true
            }
            Err(e) => {
                error!(
                    update_type = %update.update_type(),
                    timestamp = update.timestamp(),
                    error = %e,
                    "Handler failed"
                );
                false
            }
        }
    }

    fn report(&self, update: &Update, outcome: &Dispatched) {
        let update_type = update.update_type();
        let timestamp = update.timestamp();

        if !self.verbose {
            debug!(update_type, timestamp, ?outcome, "Processed update");
            return;
        }

        let dump = serde_json::to_string_pretty(&update.to_value()).unwrap_or_default();
        info!(update_type, timestamp, "Update:\n{dump}");
        match outcome {
            Dispatched::Handled(reply) => info!(update_type, timestamp, "Response:\n{reply}"),
            Dispatched::Stale => info!(update_type, timestamp, "Response: -- Pass (old update) --"),
            Dispatched::Unmatched => info!(update_type, timestamp, "Response: --NO RESPONSE--"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::tests::ManualClock;
    use async_trait::async_trait;
    use maxbot_core::{ApiCaller, ApiError, HandlerError, HttpMethod, Query, update_type};
    use maxbot_framework::{Param, Registry};
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    const NOW: i64 = 1_700_000_000_000;

    /// Answers `GET updates` from a script and records every request.
    #[derive(Default)]
    struct ScriptedCaller {
        script: Mutex<VecDeque<ApiResult<Value>>>,
        requests: Mutex<Vec<(String, Query)>>,
    }

    impl ScriptedCaller {
        fn with(script: Vec<ApiResult<Value>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                requests: Mutex::default(),
            })
        }

        fn markers(&self) -> Vec<Option<String>> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .filter(|(endpoint, _)| endpoint == "updates")
                .map(|(_, query)| query.get("marker").map(str::to_string))
                .collect()
        }
    }

    #[async_trait]
    impl ApiCaller for ScriptedCaller {
        async fn call(
            &self,
            _method: HttpMethod,
            endpoint: &str,
            _body: Option<Value>,
            query: Query,
        ) -> ApiResult<Value> {
            self.requests
                .lock()
                .unwrap()
                .push((endpoint.to_string(), query));
            if endpoint != "updates" {
                return Ok(json!({}));
            }
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(json!({ "updates": [] })))
        }
    }

    fn message(text: &str, timestamp: i64) -> Value {
        json!({
            "update_type": update_type::MESSAGE_CREATED,
            "timestamp": timestamp,
            "message": { "sender": { "user_id": 1 }, "body": { "text": text } }
        })
    }

    fn batch(updates: Vec<Value>) -> ApiResult<Value> {
        Ok(json!({ "updates": updates }))
    }

    fn failing_dispatcher() -> Dispatcher {
        let registry = Registry::new().on(update_type::MESSAGE_CREATED, |param: Param| async move {
            if param.text() == "fail" {
                Err(HandlerError::msg("handler exploded"))
            } else {
                Ok(())
            }
        });
        Dispatcher::new(registry)
    }

    fn poller(caller: Arc<ScriptedCaller>, dispatcher: Dispatcher, clock: Arc<ManualClock>) -> Poller {
        Poller::new(MaxApi::new(caller), dispatcher)
            .with_clock(clock)
            .verbose(false)
    }

    #[test]
    fn test_cursor_marker() {
        let mut cursor = PollCursor::default();
        assert_eq!(cursor.marker(), None);
        cursor.advance(10);
        cursor.advance(5);
        assert_eq!(cursor.get(), 10);
        assert_eq!(cursor.marker(), Some(10));
    }

    #[tokio::test]
    async fn test_cursor_reaches_last_timestamp_despite_handler_error() {
        let caller = ScriptedCaller::with(vec![batch(vec![
            message("a", NOW + 1),
            message("fail", NOW + 2),
            message("c", NOW + 3),
        ])]);
        let clock = Arc::new(ManualClock::at(NOW));
        let mut poller = poller(caller, failing_dispatcher(), clock);

        let outcome = poller.poll_once().await;

        assert_eq!(outcome, IterationOutcome::Processed { updates: 3, failed: 1 });
        assert_eq!(poller.cursor().get(), NOW + 3);
    }

    #[tokio::test]
    async fn test_marker_sent_once_cursor_is_set() {
        let caller = ScriptedCaller::with(vec![batch(vec![message("a", NOW)])]);
        let clock = Arc::new(ManualClock::at(NOW));
        let mut poller = poller(caller.clone(), failing_dispatcher(), clock)
            .types(vec!["message_created".into(), "bot_started".into()]);

        poller.poll_once().await;
        poller.poll_once().await;

        assert_eq!(caller.markers(), vec![None, Some(NOW.to_string())]);
        let requests = caller.requests.lock().unwrap();
        assert_eq!(requests[0].1.get("types"), Some("message_created,bot_started"));
    }

    #[tokio::test]
    async fn test_stale_updates_still_advance_cursor() {
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        let registry = Registry::new().on("*", move || {
            let counter = Arc::clone(&counter);
            async move {
                *counter.lock().unwrap() += 1;
            }
        });
        let caller = ScriptedCaller::with(vec![batch(vec![message("old", NOW - 200_000)])]);
        let clock = Arc::new(ManualClock::at(NOW));
        let mut poller = poller(caller, Dispatcher::new(registry), clock);

        poller.poll_once().await;

        assert_eq!(*calls.lock().unwrap(), 0);
        assert_eq!(poller.cursor().get(), NOW - 200_000);
    }

    #[tokio::test]
    async fn test_undecodable_update_is_skipped() {
        let caller = ScriptedCaller::with(vec![batch(vec![
            json!({ "no_type": true }),
            message("ok", NOW + 7),
        ])]);
        let clock = Arc::new(ManualClock::at(NOW));
        let mut poller = poller(caller, failing_dispatcher(), clock);

        let outcome = poller.poll_once().await;

        assert_eq!(outcome, IterationOutcome::Processed { updates: 2, failed: 0 });
        assert_eq!(poller.cursor().get(), NOW + 7);
    }

    #[tokio::test]
    async fn test_fetch_error_keeps_cursor() {
        let caller = ScriptedCaller::with(vec![Err(ApiError::transport("updates", "connection reset"))]);
        let clock = Arc::new(ManualClock::at(NOW));
        let mut poller = poller(caller, failing_dispatcher(), clock);

        assert_eq!(poller.poll_once().await, IterationOutcome::Failed);
        assert_eq!(poller.cursor(), PollCursor::default());
    }

    #[tokio::test]
    async fn test_run_sleeps_and_stops_on_cancel() {
        let cancel = CancellationToken::new();
        let stopper = cancel.clone();
        let registry = Registry::new().command("stop", move || {
            let stopper = stopper.clone();
            async move { stopper.cancel() }
        });

        let caller = ScriptedCaller::with(vec![
            Err(ApiError::protocol("updates", "garbage")),
            batch(vec![message("hello", NOW)]),
            batch(vec![message("/stop", NOW + 1)]),
        ]);
        let clock = Arc::new(ManualClock::at(NOW));
        let mut poller = poller(caller, Dispatcher::new(registry), clock.clone());

        poller.run(cancel).await;

        assert_eq!(clock.sleeps(), vec![Duration::from_secs(5), Duration::from_secs(1)]);
        assert_eq!(poller.cursor().get(), NOW + 1);
    }

    #[tokio::test]
    async fn test_run_backs_off_after_handler_error() {
        let cancel = CancellationToken::new();
        let stopper = cancel.clone();
        let registry = Registry::new()
            .command("stop", move || {
                let stopper = stopper.clone();
                async move { stopper.cancel() }
            })
            .on(update_type::MESSAGE_CREATED, |param: Param| async move {
                Err::<(), _>(HandlerError::msg(format!("cannot handle {}", param.text())))
            });

        let caller = ScriptedCaller::with(vec![
            batch(vec![message("fail", NOW), message("later", NOW + 1)]),
            batch(vec![message("/stop", NOW + 2)]),
        ]);
        let clock = Arc::new(ManualClock::at(NOW));
        let mut poller = poller(caller, Dispatcher::new(registry), clock.clone());

        poller.run(cancel).await;

        assert_eq!(clock.sleeps(), vec![Duration::from_secs(5)]);
        assert_eq!(poller.cursor().get(), NOW + 2);
    }

    #[tokio::test]
    async fn test_run_returns_immediately_when_cancelled() {
        let caller = ScriptedCaller::with(Vec::new());
        let clock = Arc::new(ManualClock::at(NOW));
        let mut poller = poller(caller.clone(), failing_dispatcher(), clock.clone());

        let cancel = CancellationToken::new();
        cancel.cancel();
        tokio_test::assert_ready!(tokio_test::task::spawn(poller.run(cancel)).poll());

        assert!(caller.markers().is_empty());
        assert!(clock.sleeps().is_empty());
    }
}
