//! Message dispatch: prefix, match, authorize, parse, execute.
//!
//! [`CommandDispatcher::dispatch`] drives one inbound message through
//!
//! ```text
//! Idle ─▶ PrefixStripped ─▶ Matched ─▶ Authorized ─▶ Parsed ─▶ Executed
//!   │            │              │            │           │
//!   └────────────┴──────────────┴────────────┴───────────┴──▶ Ignored / Rejected
//! ```
//!
//! Non-commands end silently in [`DispatchOutcome::Ignored`]. Every failure
//! after a command matched ends in [`DispatchOutcome::Rejected`] and sends one
//! fixed reply; nothing escapes the dispatcher, not even a handler panic.
//!
//! The dispatcher is also a `tower::Service<Arc<InboundMessage>>`.

use std::any::Any;
use std::convert::Infallible;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use tower::Service;
use tracing::{Instrument, Span, debug, error, field, info, info_span, warn};

use sparkl_core::{
    BoxedClient, BoxedConfigProvider, GuildConfig, InboundMessage, Snowflake,
    StaticConfigProvider,
};

use crate::command::Command;
use crate::context::CommandContext;
use crate::error::{DispatchError, ParseError, ParseErrorKind};
use crate::permission::{self, Authorized, Invoker};
use crate::registry::CommandRegistry;
use crate::syntax::{split_tokens, tokenize_tokens};
use crate::types::{TypeMatcher, TypeRegistry};

/// Reply sent when the invoker's level is too low.
pub const PERMISSION_DENIED_MESSAGE: &str = ":negative_squared_cross_mark: Oops! Looks like you don't have the required permission to run this command.";

/// Reply sent when a handler fails or a collaborator breaks mid-dispatch.
pub const INTERNAL_ERROR_MESSAGE: &str =
    ":negative_squared_cross_mark: Internal Error. Please contact the developer.";

/// Reply for an argument that failed validation.
pub fn parse_failure_message(err: &ParseError) -> String {
    let arg = &err.argument;
    match err.kind {
        ParseErrorKind::MissingArgument => format!(
            ":negative_squared_cross_mark: Missing argument `{}` of type `{}`.",
            arg.name, arg.type_name
        ),
        ParseErrorKind::ParseFailed => format!(
            ":negative_squared_cross_mark: Invalid value for argument `{}`: expected type `{}`.",
            arg.name, arg.type_name
        ),
    }
}

// =============================================================================
// Outcome
// =============================================================================

/// Why a message was not treated as a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NotInGuild,
    FromBot,
    MissingPrefix,
    NoMatchingCommand,
    /// The guild config could not be fetched.
    ProviderUnavailable,
}

/// Terminal state of one dispatch.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Not a command. Nothing was sent.
    Ignored(IgnoreReason),
    /// The handler ran to completion.
    Executed { command: Arc<Command> },
    /// A matched command was stopped; one error reply was attempted.
    Rejected {
        command: Arc<Command>,
        error: DispatchError,
    },
}

impl DispatchOutcome {
    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored(_))
    }

    pub fn is_executed(&self) -> bool {
        matches!(self, Self::Executed { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// The matched command, if any.
    pub fn command(&self) -> Option<&Arc<Command>> {
        match self {
            Self::Ignored(_) => None,
            Self::Executed { command } | Self::Rejected { command, .. } => Some(command),
        }
    }

    pub fn error(&self) -> Option<&DispatchError> {
        match self {
            Self::Rejected { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Message filters applied before any config lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Drop messages from bot accounts.
    pub ignore_bots: bool,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self { ignore_bots: true }
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Routes inbound messages to registered commands.
///
/// Cloning is cheap; clones share the registry, types and provider.
#[derive(Clone)]
pub struct CommandDispatcher {
    registry: Arc<CommandRegistry>,
    types: Arc<RwLock<Arc<TypeRegistry>>>,
    provider: Arc<RwLock<BoxedConfigProvider>>,
    client: BoxedClient,
    settings: DispatchSettings,
}

impl CommandDispatcher {
    /// Creates a dispatcher with an empty registry, the built-in types and a
    /// [`StaticConfigProvider`] serving default settings.
    pub fn new(client: BoxedClient) -> Self {
        Self {
            registry: Arc::new(CommandRegistry::new()),
            types: Arc::new(RwLock::new(Arc::new(TypeRegistry::with_builtins()))),
            provider: Arc::new(RwLock::new(Arc::new(StaticConfigProvider::default()))),
            client,
            settings: DispatchSettings::default(),
        }
    }

    pub fn with_registry(mut self, registry: Arc<CommandRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_types(self, types: TypeRegistry) -> Self {
        *self.types.write() = Arc::new(types);
        self
    }

    pub fn with_provider(self, provider: BoxedConfigProvider) -> Self {
        self.set_provider(provider);
        self
    }

    pub fn with_settings(mut self, settings: DispatchSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// Snapshot of the current type table.
    pub fn types(&self) -> Arc<TypeRegistry> {
        self.types.read().clone()
    }

    /// Adds or replaces a type matcher. In-flight dispatches keep the table
    /// they started with.
    pub fn register_type(&self, type_name: impl Into<String>, matcher: impl TypeMatcher) {
        let mut types = self.types.write();
        Arc::make_mut(&mut types).register(type_name, matcher);
    }

    pub fn provider(&self) -> BoxedConfigProvider {
        self.provider.read().clone()
    }

    /// Replaces the config provider for subsequent messages.
    pub fn set_provider(&self, provider: BoxedConfigProvider) {
        *self.provider.write() = provider;
    }

    pub fn client(&self) -> &BoxedClient {
        &self.client
    }

    pub fn settings(&self) -> DispatchSettings {
        self.settings
    }

    /// Checks whether the author of `message` may run `command`, without
    /// running anything. Messages outside a guild are checked against
    /// default settings.
    pub async fn can_run(
        &self,
        command: &Command,
        message: &InboundMessage,
    ) -> Result<Authorized, DispatchError> {
        let config = match message.guild_id {
            Some(guild) => self.provider().fetch_guild_config(guild).await?,
            None => GuildConfig::default(),
        };
        Ok(permission::resolve(
            command,
            Invoker::from(message),
            &config.permissions,
        )?)
    }

    /// Runs one message through the dispatch pipeline.
    pub async fn dispatch(&self, message: Arc<InboundMessage>) -> DispatchOutcome {
        let span = info_span!(
            "dispatch",
            message = %message.id,
            guild = field::Empty,
            command = field::Empty
        );
        self.dispatch_inner(message).instrument(span).await
    }

    async fn dispatch_inner(&self, message: Arc<InboundMessage>) -> DispatchOutcome {
        let Some(guild_id) = message.guild_id else {
            return DispatchOutcome::Ignored(IgnoreReason::NotInGuild);
        };
        Span::current().record("guild", field::display(guild_id));

        if self.settings.ignore_bots && message.author.bot {
            return DispatchOutcome::Ignored(IgnoreReason::FromBot);
        }

        // Idle -> PrefixStripped
        let config = match self.provider().fetch_guild_config(guild_id).await {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to fetch guild config: {e}");
                return DispatchOutcome::Ignored(IgnoreReason::ProviderUnavailable);
            }
        };
        let Some(body) = message.content.strip_prefix(config.prefix.as_str()) else {
            return DispatchOutcome::Ignored(IgnoreReason::MissingPrefix);
        };

        // PrefixStripped -> Matched
        let tokens = split_tokens(body);
        let Some(found) = self.registry.find_best_match_for(Some(guild_id), &tokens) else {
            return DispatchOutcome::Ignored(IgnoreReason::NoMatchingCommand);
        };
        let command = found.command;
        Span::current().record("command", field::display(command.path()));

        // Matched -> Authorized
        let invoker = Invoker::from(message.as_ref());
        if let Err(e) = permission::resolve(&command, invoker, &config.permissions) {
            info!(user = %message.author.id, "{e}");
            self.reply(message.channel_id, PERMISSION_DENIED_MESSAGE)
                .await;
            return DispatchOutcome::Rejected {
                command,
                error: e.into(),
            };
        }

        // Authorized -> Parsed
        let guild = match self.client.guild(guild_id).await {
            Ok(guild) => guild,
            Err(e) => {
                error!("Failed to resolve guild: {e}");
                self.reply(message.channel_id, INTERNAL_ERROR_MESSAGE).await;
                return DispatchOutcome::Rejected {
                    command,
                    error: e.into(),
                };
            }
        };
        let types = self.types();
        let args = match tokenize_tokens(
            command.syntax(),
            &tokens[found.consumed..],
            &types,
            guild.as_ref(),
        ) {
            Ok(args) => args,
            Err(e) => {
                debug!(argument = %e.argument.name, "{e}");
                self.reply(message.channel_id, &parse_failure_message(&e))
                    .await;
                return DispatchOutcome::Rejected {
                    command,
                    error: e.into(),
                };
            }
        };

        // Parsed -> Executed
        let ctx = CommandContext::new(
            message.clone(),
            guild,
            self.client.clone(),
            command.clone(),
            found.invoked_as,
            Arc::new(config),
        );
        let handler = command.handler().clone();
        let result = AssertUnwindSafe(async move { handler.call(ctx, args).await })
            .catch_unwind()
            .await;

        let error = match result {
            Ok(Ok(())) => {
                debug!("Command executed");
                return DispatchOutcome::Executed { command };
            }
            Ok(Err(e)) => {
                error!("Command handler failed: {e}");
                DispatchError::Handler(e)
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!("Command handler panicked: {reason}");
                DispatchError::Panicked(reason)
            }
        };
        self.reply(message.channel_id, INTERNAL_ERROR_MESSAGE).await;
        DispatchOutcome::Rejected { command, error }
    }

    async fn reply(&self, channel: Snowflake, content: &str) {
        if let Err(e) = self.client.send(channel, content).await {
            warn!("Failed to send reply: {e}");
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("commands", &self.registry.len())
            .field("types", &self.types.read().len())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Service<Arc<InboundMessage>> for CommandDispatcher {
    type Response = DispatchOutcome;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<DispatchOutcome, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, message: Arc<InboundMessage>) -> Self::Future {
        let this = self.clone();
        Box::pin(async move { Ok(this.dispatch(message).await) })
    }
}
