//! The client facade tying the engine to a chat client and its messages.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sparkl_runtime::SparklClient;
//!
//! let config = load_config()?;
//! logging::init_from_config(&config.logging);
//!
//! let client = SparklClient::from_config(chat_client, &config)?;
//! client.command(Command::new("ping", 0, Syntax::empty(), ping));
//! client.plugin("greeter", |scope| { /* ... */ Ok(()) })?;
//!
//! // Runs until the stream ends, Ctrl+C / SIGTERM, or `client.shutdown()`.
//! client.run(messages).await?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use sparkl_core::{BoxedClient, ConfigProvider, InboundMessage};
use sparkl_framework::{
    BoxError, Command, CommandDispatcher, CommandRegistry, DispatchError, DispatchOutcome,
    DispatchSettings, FnPlugin, ListenerId, ListenerSet, MessageListener, Plugin, PluginRegistry,
    PluginReport, PluginScope, Registration, TypeMatcher,
};

use crate::config::{SparklConfig, validate_config};
use crate::error::RuntimeResult;
use crate::logging;

/// Owns the command engine and feeds it inbound messages.
///
/// Every message first goes to the message listeners, then through the
/// dispatcher.
pub struct SparklClient {
    dispatcher: CommandDispatcher,
    listeners: Arc<ListenerSet>,
    plugins: PluginRegistry,
    /// Plugin config sections, keyed by plugin name.
    plugin_configs: HashMap<String, Arc<serde_json::Value>>,
    shutdown: CancellationToken,
}

impl SparklClient {
    /// Creates a client with default settings and an empty registry.
    pub fn new(client: BoxedClient) -> Self {
        Self::with_dispatcher(CommandDispatcher::new(client))
    }

    fn with_dispatcher(dispatcher: CommandDispatcher) -> Self {
        let listeners = Arc::new(ListenerSet::new());
        let plugins = PluginRegistry::new(dispatcher.registry().clone(), listeners.clone());
        Self {
            dispatcher,
            listeners,
            plugins,
            plugin_configs: HashMap::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Creates a client from a loaded configuration.
    ///
    /// Static guild entries become the initial config provider and the
    /// `plugins` sections are handed to plugins as they attach.
    pub fn from_config(client: BoxedClient, config: &SparklConfig) -> RuntimeResult<Self> {
        validate_config(config)?;
        logging::log_settings(config);

        let provider = config.config_provider()?;
        let dispatcher = CommandDispatcher::new(client)
            .with_provider(Arc::new(provider))
            .with_settings(DispatchSettings {
                ignore_bots: config.client.ignore_bots,
            });
        let mut this = Self::with_dispatcher(dispatcher);
        this.plugin_configs = config
            .plugins
            .iter()
            .map(|(name, value)| (name.clone(), Arc::new(value.clone())))
            .collect();

        info!(
            prefix = %config.client.prefix,
            guilds = config.guilds.len(),
            plugin_sections = config.plugins.len(),
            "Client initialized from configuration"
        );
        Ok(this)
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        self.dispatcher.registry()
    }

    pub fn listeners(&self) -> &Arc<ListenerSet> {
        &self.listeners
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Registers a command. Collisions are logged and returned as warnings.
    pub fn command(&self, command: Command) -> Registration {
        self.dispatcher.registry().register(command)
    }

    /// Adds or replaces the matcher for `type_name`.
    pub fn register_type(&self, type_name: impl Into<String>, matcher: impl TypeMatcher) {
        self.dispatcher.register_type(type_name, matcher);
    }

    /// Adds a listener invoked for every inbound message.
    pub fn on_message(&self, listener: impl MessageListener) -> ListenerId {
        self.listeners.add(listener, None)
    }

    /// Attaches a plugin built from a name and a start function.
    pub fn plugin<F>(&self, name: impl Into<String>, start: F) -> RuntimeResult<PluginReport>
    where
        F: Fn(&mut PluginScope<'_>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.add_plugin(FnPlugin::new(name, start))
    }

    /// Attaches a plugin with its `plugins.<name>` config section.
    pub fn add_plugin(&self, plugin: impl Plugin) -> RuntimeResult<PluginReport> {
        let config = self
            .plugin_configs
            .get(plugin.name())
            .cloned()
            .unwrap_or_else(|| Arc::new(serde_json::Value::Null));
        Ok(self.plugins.attach(Arc::new(plugin), config)?)
    }

    /// Detaches a plugin, removing its commands and listeners.
    pub fn remove_plugin(&self, name: &str) -> RuntimeResult<()> {
        Ok(self.plugins.detach(name)?)
    }

    /// Replaces the config provider for subsequent messages.
    pub fn use_config_provider(&self, provider: impl ConfigProvider) {
        self.dispatcher.set_provider(Arc::new(provider));
        debug!("Config provider replaced");
    }

    // =========================================================================
    // Message handling
    // =========================================================================

    /// Runs the config provider's init hook.
    pub async fn init(&self) -> RuntimeResult<()> {
        self.dispatcher.provider().init().await?;
        debug!("Config provider initialized");
        Ok(())
    }

    /// Whether the author of `message` may run `command`.
    ///
    /// Errors only when the guild settings cannot be fetched.
    pub async fn can_run(&self, command: &Command, message: &InboundMessage) -> RuntimeResult<bool> {
        match self.dispatcher.can_run(command, message).await {
            Ok(_) => Ok(true),
            Err(DispatchError::Permission(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Notifies listeners, then dispatches `message`.
    pub async fn handle_message(&self, message: Arc<InboundMessage>) -> DispatchOutcome {
        process(&self.listeners, &self.dispatcher, message).await
    }

    /// Handles every message from `messages`, one task per message.
    ///
    /// Returns once the stream ends, a shutdown signal arrives or
    /// [`shutdown`](Self::shutdown) is called, after in-flight messages finish.
    pub async fn run<S>(&self, messages: S) -> RuntimeResult<()>
    where
        S: Stream<Item = InboundMessage> + Send,
    {
        self.init().await?;

        let tracker = TaskTracker::new();
        let mut messages = std::pin::pin!(messages);
        let mut signal = std::pin::pin!(wait_for_signal());

        info!(
            commands = self.registry().len(),
            plugins = self.plugins.len(),
            "sparkl client is running"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }
                _ = &mut signal => break,
                next = messages.next() => {
                    let Some(message) = next else {
                        info!("Message stream ended");
                        break;
                    };
                    let listeners = self.listeners.clone();
                    let dispatcher = self.dispatcher.clone();
                    tracker.spawn(async move {
                        process(&listeners, &dispatcher, Arc::new(message)).await;
                    });
                }
            }
        }

        tracker.close();
        if !tracker.is_empty() {
            debug!(pending = tracker.len(), "Waiting for in-flight messages");
        }
        tracker.wait().await;
        info!("sparkl client stopped");
        Ok(())
    }

    /// Stops a running [`run`](Self::run) loop.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Token cancelled by [`shutdown`](Self::shutdown).
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

impl std::fmt::Debug for SparklClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SparklClient")
            .field("dispatcher", &self.dispatcher)
            .field("listeners", &self.listeners.len())
            .field("plugins", &self.plugins)
            .finish_non_exhaustive()
    }
}

async fn process(
    listeners: &ListenerSet,
    dispatcher: &CommandDispatcher,
    message: Arc<InboundMessage>,
) -> DispatchOutcome {
    listeners.notify(message.clone()).await;
    dispatcher.dispatch(message).await
}

/// Waits for Ctrl+C or SIGTERM. Never resolves if no handler can be installed.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => {
                        info!("Received Ctrl+C, shutting down");
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down");
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
                if signal::ctrl_c().await.is_ok() {
                    info!("Received Ctrl+C, shutting down");
                } else {
                    std::future::pending::<()>().await;
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
        } else {
            warn!("Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde::Deserialize;

    use super::*;
    use crate::error::RuntimeError;
    use sparkl_core::{
        Author, ChatClient, GuildConfig, GuildLookup, GuildSnapshot, PermissionConfig,
        ProviderResult, Snowflake, StaticConfigProvider, TransportResult,
    };
    use sparkl_framework::{Arguments, CommandContext, HandlerResult, PluginError, Syntax};

    const GUILD: u64 = 1;
    const CHANNEL: u64 = 10;

    #[derive(Default)]
    struct RecordingClient {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChatClient for RecordingClient {
        async fn send(&self, _channel: Snowflake, content: &str) -> TransportResult<()> {
            self.sent.lock().push(content.to_string());
            Ok(())
        }

        async fn guild(&self, guild: Snowflake) -> TransportResult<Arc<dyn GuildLookup>> {
            Ok(Arc::new(GuildSnapshot::new(guild).with_channel(CHANNEL, "general")))
        }
    }

    struct CountingProvider {
        inits: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ConfigProvider for CountingProvider {
        async fn init(&self) -> ProviderResult<()> {
            self.inits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn fetch_guild_config(&self, _guild: Snowflake) -> ProviderResult<GuildConfig> {
            Ok(GuildConfig::with_prefix("?"))
        }
    }

    async fn ping(ctx: CommandContext, _args: Arguments) -> HandlerResult {
        ctx.reply("pong").await?;
        Ok(())
    }

    async fn hello(ctx: CommandContext, _args: Arguments) -> HandlerResult {
        ctx.reply("hello").await?;
        Ok(())
    }

    fn message(id: u64, user: u64, content: &str) -> InboundMessage {
        InboundMessage::new(id, CHANNEL, Author::new(user, "alice"), content).in_guild(GUILD)
    }

    fn client() -> (SparklClient, Arc<RecordingClient>) {
        let chat = Arc::new(RecordingClient::default());
        (SparklClient::new(chat.clone()), chat)
    }

    #[tokio::test]
    async fn test_handle_message_runs_command() {
        let (client, chat) = client();
        client.command(Command::new("ping", 0, Syntax::empty(), ping));

        let outcome = client.handle_message(Arc::new(message(1, 100, "!ping"))).await;
        assert!(outcome.is_executed());
        assert_eq!(*chat.sent.lock(), vec!["pong"]);
    }

    #[tokio::test]
    async fn test_listeners_see_every_message() {
        let (client, _chat) = client();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        client.on_message(move |_message: Arc<InboundMessage>| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<(), BoxError>(())
            }
        });

        client.handle_message(Arc::new(message(1, 100, "just chatting"))).await;
        client.handle_message(Arc::new(message(2, 100, "!nothing"))).await;
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct GreeterConfig {
        trigger: String,
    }

    #[tokio::test]
    async fn test_plugin_reads_config_and_detaches() {
        let mut config = SparklConfig::default();
        config
            .plugins
            .insert("greeter".into(), serde_json::json!({ "trigger": "hi" }));
        let chat = Arc::new(RecordingClient::default());
        let client = SparklClient::from_config(chat.clone(), &config).unwrap();

        let report = client
            .plugin("greeter", |scope| {
                let config: GreeterConfig = scope.get_config()?;
                scope.command(Command::new(config.trigger, 0, Syntax::empty(), hello));
                Ok(())
            })
            .unwrap();
        assert_eq!(report.commands.len(), 1);

        assert!(client.handle_message(Arc::new(message(1, 100, "!hi"))).await.is_executed());
        assert_eq!(*chat.sent.lock(), vec!["hello"]);

        client.remove_plugin("greeter").unwrap();
        assert!(client.handle_message(Arc::new(message(2, 100, "!hi"))).await.is_ignored());
        assert!(matches!(
            client.remove_plugin("greeter"),
            Err(RuntimeError::Plugin(PluginError::NotAttached(_)))
        ));
    }

    #[tokio::test]
    async fn test_from_config_rejects_invalid() {
        let mut config = SparklConfig::default();
        config.client.prefix = String::new();
        let chat = Arc::new(RecordingClient::default());
        assert!(matches!(
            SparklClient::from_config(chat, &config),
            Err(RuntimeError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_from_config_uses_guild_settings() {
        let mut config = SparklConfig::default();
        config.guilds.insert(
            GUILD.to_string(),
            GuildConfig::with_prefix("$").permissions(PermissionConfig::default().with_user(100u64, 5)),
        );
        let chat = Arc::new(RecordingClient::default());
        let client = SparklClient::from_config(chat.clone(), &config).unwrap();
        let ban = Command::from_path("mod.ban", 5, Syntax::empty(), ping);
        client.command(ban.clone());

        assert!(client.handle_message(Arc::new(message(1, 100, "$mod ban"))).await.is_executed());
        assert!(client.can_run(&ban, &message(2, 100, "")).await.unwrap());
        assert!(!client.can_run(&ban, &message(3, 200, "")).await.unwrap());
    }

    #[tokio::test]
    async fn test_use_config_provider_and_init() {
        let (client, chat) = client();
        client.command(Command::new("ping", 0, Syntax::empty(), ping));
        client.use_config_provider(StaticConfigProvider::new(GuildConfig::with_prefix("?")));

        assert!(client.handle_message(Arc::new(message(1, 100, "!ping"))).await.is_ignored());
        assert!(client.handle_message(Arc::new(message(2, 100, "?ping"))).await.is_executed());
        assert_eq!(chat.sent.lock().len(), 1);

        let inits = Arc::new(AtomicUsize::new(0));
        client.use_config_provider(CountingProvider {
            inits: inits.clone(),
        });
        client.init().await.unwrap();
        assert_eq!(inits.load(Ordering::SeqCst), 1);
        assert!(client.handle_message(Arc::new(message(3, 100, "?ping"))).await.is_executed());
    }

    #[tokio::test]
    async fn test_run_until_stream_ends() {
        let (client, chat) = client();
        client.command(Command::new("ping", 0, Syntax::empty(), ping));

        let messages = futures::stream::iter(vec![
            message(1, 100, "!ping"),
            message(2, 100, "not a command"),
            message(3, 100, "!ping"),
        ]);
        client.run(messages).await.unwrap();
        assert_eq!(chat.sent.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_stops_run() {
        let (client, _chat) = client();
        client.shutdown();
        client
            .run(futures::stream::pending::<InboundMessage>())
            .await
            .unwrap();
        assert!(client.shutdown_token().is_cancelled());
    }
}
