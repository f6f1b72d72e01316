//! Bot bootstrap.
//!
//! [`MaxBot`] ties configuration, registrations and delivery together:
//!
//! ```rust,ignore
//! use maxbot_runtime::MaxBot;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     MaxBot::from_env()?
//!         .command("start", "Welcome!")
//!         .command("echo", |param: Param| async move { param.text().to_string() })
//!         .describe_command("echo", "Repeat your text")
//!         .start_polling(Vec::new())
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! The token is required: building a bot without one fails with
//! [`StartupError::MissingToken`] before anything else happens.

use std::sync::Arc;

use serde_json::Value;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use maxbot_core::{ApiCaller, ApiResult, BotCommand, MaxApi};
use maxbot_framework::{Dispatcher, IntoHandler, Registry, RegistryResult};
use maxbot_transport::{HttpApiCaller, WebhookServer};

use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigLoader, MaxBotConfig};
use crate::error::{StartupError, StartupResult};
use crate::logging;
use crate::poller::Poller;
use crate::push::PushDelivery;

/// A configured bot, ready to start in polling or webhook mode.
pub struct MaxBot {
    config: MaxBotConfig,
    api: MaxApi,
    registry: Registry,
    commands: Vec<BotCommand>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for MaxBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaxBot")
            .field("base_url", &self.config.api.base_url)
            .field("registry", &self.registry)
            .field("commands", &self.commands)
            .finish_non_exhaustive()
    }
}

impl MaxBot {
    /// Loads configuration from the default sources and overrides the token.
    pub fn new(token: impl Into<String>) -> StartupResult<Self> {
        let config = ConfigLoader::new().token(token).load()?;
        Self::from_config(config)
    }

    /// Loads configuration from files and `MAXBOT_*` / `BOT_TOKEN` variables.
    pub fn from_env() -> StartupResult<Self> {
        Self::from_config(ConfigLoader::new().load()?)
    }

    /// Builds a bot from an already loaded configuration.
    ///
    /// Initializes logging and creates the HTTP API client.
    pub fn from_config(config: MaxBotConfig) -> StartupResult<Self> {
        if config.token.trim().is_empty() {
            return Err(StartupError::MissingToken);
        }
        logging::init_from_config(&config.logging);

        let caller = HttpApiCaller::with_options(
            config.token.clone(),
            &config.api.base_url,
            config.api.timeout(),
        )
        .map_err(|e| StartupError::Client(e.to_string()))?;

        Self::with_caller(config, Arc::new(caller))
    }

    /// Builds a bot over a custom [`ApiCaller`].
    pub fn with_caller(config: MaxBotConfig, caller: Arc<dyn ApiCaller>) -> StartupResult<Self> {
        if config.token.trim().is_empty() {
            return Err(StartupError::MissingToken);
        }
        Ok(Self {
            config,
            api: MaxApi::new(caller),
            registry: Registry::new(),
            commands: Vec::new(),
            clock: Arc::new(SystemClock),
        })
    }

    /// Replaces the clock used for staleness checks and sleeps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Registers a `/name` command. See [`Registry::command`].
    pub fn command<H, M>(mut self, name: impl Into<String>, handler: H) -> Self
    where
        H: IntoHandler<M>,
    {
        self.registry = self.registry.command(name, handler);
        self
    }

    /// Registers a raw command regex. See [`Registry::regex`].
    pub fn regex<H, M>(mut self, pattern: &str, handler: H) -> RegistryResult<Self>
    where
        H: IntoHandler<M>,
    {
        self.registry = self.registry.regex(pattern, handler)?;
        Ok(self)
    }

    /// Registers an event handler. See [`Registry::on`].
    pub fn on<H, M>(mut self, events: &str, handler: H) -> Self
    where
        H: IntoHandler<M>,
    {
        self.registry = self.registry.on(events, handler);
        self
    }

    /// Registers a callback action. See [`Registry::action`].
    pub fn action<H, M>(mut self, pattern: &str, handler: H) -> RegistryResult<Self>
    where
        H: IntoHandler<M>,
    {
        self.registry = self.registry.action(pattern, handler)?;
        Ok(self)
    }

    /// Replaces the registry wholesale.
    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    /// Adds a command description pushed to the platform when the bot starts.
    pub fn describe_command(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.commands.push(BotCommand::new(name, description));
        self
    }

    /// Overrides the per-update dump setting from the configuration.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.logging.verbose = verbose;
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Returns the API client.
    pub fn api(&self) -> &MaxApi {
        &self.api
    }

    /// Returns the configuration.
    pub fn config(&self) -> &MaxBotConfig {
        &self.config
    }

    /// Declares the command list shown by the platform UI.
    pub async fn set_my_commands(&self, commands: &[BotCommand]) -> ApiResult<Value> {
        self.api.set_my_commands(commands).await
    }

    fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(self.registry.clone()).with_staleness(self.config.polling.staleness())
    }

    fn banner(&self, mode: &str) {
        let debug_mode = if self.config.logging.verbose { "ON" } else { "OFF" };
        info!(
            version = env!("CARGO_PKG_VERSION"),
            mode,
            debug_mode,
            "MaxBot starting"
        );
        info!(
            commands = self.registry.command_count(),
            events = self.registry.event_count(),
            actions = self.registry.action_count(),
            "Handlers registered"
        );
    }

    async fn push_command_metadata(&self) {
        if self.commands.is_empty() {
            return;
        }
        match self.set_my_commands(&self.commands).await {
            Ok(_) => info!(count = self.commands.len(), "Published bot commands"),
            Err(e) => warn!(error = %e, "Failed to publish bot commands"),
        }
    }

    // =========================================================================
    // Delivery
    // =========================================================================

    /// Long-polls until Ctrl+C or SIGTERM.
    ///
    /// `types` restricts the update types requested; when empty, the
    /// configured `polling.types` are used.
    pub async fn start_polling(self, types: Vec<String>) -> StartupResult<()> {
        let cancel = CancellationToken::new();
        let shutdown = cancel.clone();
        tokio::spawn(async move {
            wait_for_shutdown().await;
            shutdown.cancel();
        });
        self.start_polling_until(types, cancel).await
    }

    /// Long-polls until `cancel` fires.
    pub async fn start_polling_until(
        self,
        types: Vec<String>,
        cancel: CancellationToken,
    ) -> StartupResult<()> {
        self.banner("Long Polling");
        self.push_command_metadata().await;

        let mut poller = Poller::new(self.api.clone(), self.dispatcher())
            .with_config(&self.config.polling)
            .with_clock(Arc::clone(&self.clock))
            .verbose(self.config.logging.verbose);
        if !types.is_empty() {
            poller = poller.types(types);
        }

        poller.run(cancel).await;
        Ok(())
    }

    /// Serves the webhook until Ctrl+C or SIGTERM.
    pub async fn start_webhook(self) -> StartupResult<()> {
        let cancel = CancellationToken::new();
        let shutdown = cancel.clone();
        tokio::spawn(async move {
            wait_for_shutdown().await;
            shutdown.cancel();
        });
        self.start_webhook_until(cancel).await
    }

    /// Serves the webhook until `cancel` fires.
    pub async fn start_webhook_until(self, cancel: CancellationToken) -> StartupResult<()> {
        self.banner("Webhook");
        self.push_command_metadata().await;

        let webhook = &self.config.webhook;
        let delivery = PushDelivery::new(self.api.clone(), self.dispatcher())
            .with_clock(Arc::clone(&self.clock))
            .verbose(self.config.logging.verbose);
        let server = WebhookServer::bind(&webhook.bind_addr(), &webhook.path, Arc::new(delivery)).await?;

        server.serve(cancel).await?;
        Ok(())
    }
}

/// Waits for Ctrl+C or, on unix, SIGTERM.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
                return;
            }
            Err(e) => error!(error = %e, "Failed to register SIGTERM handler"),
        }
    }

    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => error!(error = %e, "Failed to listen for Ctrl+C"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::tests::ManualClock;
    use async_trait::async_trait;
    use maxbot_core::{HttpMethod, Query};
    use maxbot_framework::Param;
    use serde_json::json;
    use std::sync::Mutex;

    const NOW: i64 = 1_700_000_000_000;

    /// Serves one batch, then empty batches, recording every call.
    #[derive(Default)]
    struct OneBatch {
        served: Mutex<bool>,
        calls: Mutex<Vec<(HttpMethod, String, Option<Value>)>>,
    }

    #[async_trait]
    impl ApiCaller for OneBatch {
        async fn call(
            &self,
            method: HttpMethod,
            endpoint: &str,
            body: Option<Value>,
            _query: Query,
        ) -> ApiResult<Value> {
            self.calls
                .lock()
                .unwrap()
                .push((method, endpoint.to_string(), body));
            if endpoint != "updates" {
                return Ok(json!({ "message": {} }));
            }
            let mut served = self.served.lock().unwrap();
            if *served {
                return Ok(json!({ "updates": [] }));
            }
            *served = true;
            Ok(json!({ "updates": [{
                "update_type": "message_created",
                "timestamp": NOW,
                "message": { "sender": { "user_id": 3 }, "body": { "text": "/stop" } }
            }] }))
        }
    }

    fn config() -> MaxBotConfig {
        MaxBotConfig {
            token: "t".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_token_is_fatal() {
        let err = MaxBot::with_caller(MaxBotConfig::default(), Arc::new(OneBatch::default())).unwrap_err();
        assert!(matches!(err, StartupError::MissingToken));
        assert!(matches!(
            MaxBot::from_config(MaxBotConfig::default()),
            Err(StartupError::MissingToken)
        ));
    }

    #[test]
    fn test_registration_passthrough() {
        let bot = MaxBot::with_caller(config(), Arc::new(OneBatch::default()))
            .unwrap()
            .command("start", "hi")
            .on("bot_started|user_added", "hello")
            .action("x:(.*)", "x")
            .unwrap();
        assert_eq!(bot.registry.command_count(), 1);
        assert_eq!(bot.registry.event_count(), 2);
        assert_eq!(bot.registry.action_count(), 1);
        assert!(bot.regex("(", "broken").is_err());
    }

    #[tokio::test]
    async fn test_polling_publishes_commands_and_dispatches() {
        let caller = Arc::new(OneBatch::default());
        let cancel = CancellationToken::new();
        let stopper = cancel.clone();

        let bot = MaxBot::with_caller(config(), caller.clone())
            .unwrap()
            .with_clock(Arc::new(ManualClock::at(NOW)))
            .verbose(false)
            .describe_command("stop", "Stop the bot")
            .command("stop", move |_: Param| {
                let stopper = stopper.clone();
                async move { stopper.cancel() }
            });

        bot.start_polling_until(vec!["message_created".into()], cancel)
            .await
            .unwrap();

        let calls = caller.calls.lock().unwrap();
        assert_eq!(calls[0].0, HttpMethod::Patch);
        assert_eq!(calls[0].1, "me");
        assert_eq!(calls[0].2.as_ref().unwrap()["commands"][0]["name"], "stop");
        assert_eq!(calls[1].1, "updates");
    }

    #[tokio::test]
    async fn test_webhook_stops_on_cancel() {
        let mut config = config();
        config.webhook.host = "127.0.0.1".into();
        config.webhook.port = 0;
        let bot = MaxBot::with_caller(config, Arc::new(OneBatch::default())).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        bot.start_webhook_until(cancel).await.unwrap();
    }
}
