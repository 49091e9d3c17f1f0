//! Command definitions and the handler trait.
//!
//! A [`Command`] is a group path (`["mod"]`), a name (`"ban"`), optional
//! aliases, a required permission level, a [`Syntax`] and a handler. It is
//! immutable once built; the registry shares it behind an `Arc`.
//!
//! # Example
//!
//! ```rust,ignore
//! async fn ban(ctx: CommandContext, args: Arguments) -> HandlerResult {
//!     let user = args.member("user").map(|m| m.display_name()).unwrap_or("?");
//!     ctx.reply(format!("banned {user}")).await?;
//!     Ok(())
//! }
//!
//! let command = Command::from_path("mod.ban", 5, syntax, ban)
//!     .with_options(CommandOptions::new().alias("b"));
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tower::BoxError;

use sparkl_core::Snowflake;

use crate::context::CommandContext;
use crate::syntax::{Arguments, Syntax};

/// Return type of command handlers.
pub type HandlerResult = Result<(), BoxError>;

// =============================================================================
// Handler
// =============================================================================

/// An async function invoked with the context and parsed arguments.
///
/// Implemented for every `async fn(CommandContext, Arguments) -> HandlerResult`.
pub trait CommandHandler: Send + Sync + 'static {
    fn call(&self, ctx: CommandContext, args: Arguments) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> CommandHandler for F
where
    F: Fn(CommandContext, Arguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, ctx: CommandContext, args: Arguments) -> BoxFuture<'static, HandlerResult> {
        Box::pin(self(ctx, args))
    }
}

/// Type alias for a shared command handler.
pub type BoxedCommandHandler = Arc<dyn CommandHandler>;

// =============================================================================
// Guild scope
// =============================================================================

/// The guilds a command is visible in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GuildScope {
    /// Every guild.
    #[default]
    Global,
    /// One guild.
    Single(Snowflake),
    /// A fixed set of guilds.
    Many(Vec<Snowflake>),
}

impl GuildScope {
    /// Whether the command is visible in `guild`. `None` means "no filter".
    pub fn includes(&self, guild: Option<Snowflake>) -> bool {
        match (self, guild) {
            (_, None) | (Self::Global, _) => true,
            (Self::Single(id), Some(guild)) => *id == guild,
            (Self::Many(ids), Some(guild)) => ids.contains(&guild),
        }
    }

    /// Explicit guild ids; empty for [`GuildScope::Global`].
    pub fn guilds(&self) -> &[Snowflake] {
        match self {
            Self::Global => &[],
            Self::Single(id) => std::slice::from_ref(id),
            Self::Many(ids) => ids,
        }
    }

    pub fn is_global(&self) -> bool {
        matches!(self, Self::Global)
    }

    /// Guilds in which both scopes are visible.
    ///
    /// Empty when either side is global; callers treat that case as a full
    /// overlap.
    pub fn overlap(&self, other: &GuildScope) -> Vec<Snowflake> {
        self.guilds()
            .iter()
            .filter(|id| other.guilds().contains(id))
            .copied()
            .collect()
    }

    /// Whether the two scopes share at least one guild.
    pub fn intersects(&self, other: &GuildScope) -> bool {
        self.is_global() || other.is_global() || !self.overlap(other).is_empty()
    }
}

impl From<Snowflake> for GuildScope {
    fn from(id: Snowflake) -> Self {
        Self::Single(id)
    }
}

impl From<Vec<Snowflake>> for GuildScope {
    fn from(ids: Vec<Snowflake>) -> Self {
        match ids.len() {
            0 => Self::Global,
            1 => Self::Single(ids[0]),
            _ => Self::Many(ids),
        }
    }
}

// =============================================================================
// Options
// =============================================================================

/// Optional properties of a command.
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    pub aliases: Vec<String>,
    pub guild: GuildScope,
    pub plugin: Option<String>,
}

impl CommandOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Restricts the command to one guild.
    pub fn guild(mut self, guild: impl Into<Snowflake>) -> Self {
        self.guild = GuildScope::Single(guild.into());
        self
    }

    /// Restricts the command to a set of guilds.
    pub fn guilds(mut self, guilds: impl IntoIterator<Item = Snowflake>) -> Self {
        self.guild = guilds.into_iter().collect::<Vec<_>>().into();
        self
    }

    /// Records the owning plugin.
    pub fn plugin(mut self, plugin: impl Into<String>) -> Self {
        self.plugin = Some(plugin.into());
        self
    }
}

// =============================================================================
// Command
// =============================================================================

/// A registered unit of behaviour.
#[derive(Clone)]
pub struct Command {
    name: String,
    group: Vec<String>,
    aliases: Vec<String>,
    permission_level: u32,
    syntax: Syntax,
    handler: BoxedCommandHandler,
    guild: GuildScope,
    plugin: Option<String>,
}

impl Command {
    /// Creates a top-level command.
    pub fn new(
        name: impl Into<String>,
        permission_level: u32,
        syntax: Syntax,
        handler: impl CommandHandler,
    ) -> Self {
        Self {
            name: name.into(),
            group: Vec::new(),
            aliases: Vec::new(),
            permission_level,
            syntax,
            handler: Arc::new(handler),
            guild: GuildScope::Global,
            plugin: None,
        }
    }

    /// Creates a command from a dotted path: `"mod.ban"` is command `ban` in
    /// group `["mod"]`. Empty segments are dropped.
    pub fn from_path(
        path: &str,
        permission_level: u32,
        syntax: Syntax,
        handler: impl CommandHandler,
    ) -> Self {
        let mut segments: Vec<String> = path
            .split('.')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        let name = segments.pop().unwrap_or_default();
        Self {
            group: segments,
            ..Self::new(name, permission_level, syntax, handler)
        }
    }

    /// Sets the group path.
    pub fn in_group<I, S>(mut self, group: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group = group.into_iter().map(Into::into).collect();
        self
    }

    /// Records the owning plugin.
    pub fn with_plugin(mut self, plugin: impl Into<String>) -> Self {
        self.plugin = Some(plugin.into());
        self
    }

    /// Applies aliases, guild scope and plugin ownership.
    pub fn with_options(mut self, options: CommandOptions) -> Self {
        self.aliases.extend(options.aliases);
        self.guild = options.guild;
        if options.plugin.is_some() {
            self.plugin = options.plugin;
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group(&self) -> &[String] {
        &self.group
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn has_alias(&self, token: &str) -> bool {
        self.aliases.iter().any(|a| a == token)
    }

    /// Whether `token` invokes this command (name or alias).
    pub fn answers_to(&self, token: &str) -> bool {
        self.name == token || self.has_alias(token)
    }

    /// Dotted path, e.g. `mod.ban`.
    pub fn path(&self) -> String {
        let mut path = self.group.join(".");
        if !path.is_empty() {
            path.push('.');
        }
        path.push_str(&self.name);
        path
    }

    /// The name followed by every alias.
    pub fn invocations(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// Declared level, before per-guild overrides.
    pub fn permission_level(&self) -> u32 {
        self.permission_level
    }

    pub fn syntax(&self) -> &Syntax {
        &self.syntax
    }

    pub fn guild_scope(&self) -> &GuildScope {
        &self.guild
    }

    pub fn plugin(&self) -> Option<&str> {
        self.plugin.as_deref()
    }

    pub fn handler(&self) -> &BoxedCommandHandler {
        &self.handler
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("path", &self.path())
            .field("aliases", &self.aliases)
            .field("permission_level", &self.permission_level)
            .field("syntax", &self.syntax)
            .field("guild", &self.guild)
            .field("plugin", &self.plugin)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn noop(_ctx: CommandContext, _args: Arguments) -> HandlerResult {
        Ok(())
    }

    #[test]
    fn test_from_path_splits_group() {
        let cmd = Command::from_path("mod.user.ban", 5, Syntax::empty(), noop);
        assert_eq!(cmd.name(), "ban");
        assert_eq!(cmd.group(), ["mod", "user"]);
        assert_eq!(cmd.path(), "mod.user.ban");

        let top = Command::from_path("ping", 0, Syntax::empty(), noop);
        assert!(top.group().is_empty());
        assert_eq!(top.path(), "ping");
    }

    #[test]
    fn test_options_apply() {
        let cmd = Command::new("ping", 0, Syntax::empty(), noop).with_options(
            CommandOptions::new()
                .alias("p")
                .aliases(["pong"])
                .guild(7u64)
                .plugin("util"),
        );
        assert!(cmd.answers_to("ping"));
        assert!(cmd.answers_to("p"));
        assert!(cmd.answers_to("pong"));
        assert!(!cmd.answers_to("pin"));
        assert_eq!(cmd.invocations().collect::<Vec<_>>(), ["ping", "p", "pong"]);
        assert_eq!(cmd.guild_scope(), &GuildScope::Single(Snowflake::new(7)));
        assert_eq!(cmd.plugin(), Some("util"));
    }

    #[test]
    fn test_guild_scope() {
        let a = Snowflake::new(1);
        let b = Snowflake::new(2);
        let c = Snowflake::new(3);

        assert!(GuildScope::Global.includes(Some(a)));
        assert!(GuildScope::Single(a).includes(None));
        assert!(!GuildScope::Single(a).includes(Some(b)));
        assert!(GuildScope::Many(vec![a, b]).includes(Some(b)));

        let left = GuildScope::Many(vec![a, b]);
        let right = GuildScope::Many(vec![b, c]);
        assert_eq!(left.overlap(&right), vec![b]);
        assert!(left.intersects(&right));
        assert!(!GuildScope::Single(a).intersects(&GuildScope::Single(c)));
        assert!(GuildScope::Global.intersects(&GuildScope::Single(c)));

        assert_eq!(GuildScope::from(Vec::new()), GuildScope::Global);
        assert_eq!(GuildScope::from(vec![a]), GuildScope::Single(a));
    }
}
