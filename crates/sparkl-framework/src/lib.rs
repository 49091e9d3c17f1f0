//! # sparkl Framework
//!
//! The command resolution and argument parsing engine.
//!
//! This layer provides:
//! - Type matchers that turn tokens into typed values ([`types`])
//! - Argument declarations and the tokenizer ([`syntax`])
//! - The command registry with longest-group-prefix matching ([`registry`])
//! - Permission level resolution ([`permission`])
//! - The dispatch state machine, also usable as a tower service ([`dispatcher`])
//! - Message listeners and plugin bookkeeping ([`listener`], [`plugin`])
//!
//! Nothing here talks to the network; the chat client and config provider are
//! the traits defined in `sparkl-core`.

pub mod command;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod listener;
pub mod permission;
pub mod plugin;
pub mod registry;
pub mod syntax;
pub mod types;

pub use command::{
    BoxedCommandHandler, Command, CommandHandler, CommandOptions, GuildScope, HandlerResult,
};
pub use context::CommandContext;
pub use dispatcher::{
    CommandDispatcher, DispatchOutcome, DispatchSettings, INTERNAL_ERROR_MESSAGE, IgnoreReason,
    PERMISSION_DENIED_MESSAGE, parse_failure_message,
};
pub use error::{
    DispatchError, MatchError, ParseError, ParseErrorKind, PermissionError, PluginError,
    SyntaxError,
};
pub use listener::{ListenerId, ListenerSet, MessageListener};
pub use permission::{Authorized, Invoker};
pub use plugin::{FnPlugin, Plugin, PluginRegistry, PluginReport, PluginScope};
pub use registry::{
    CommandId, CommandMatch, CommandRegistry, RegisteredCommand, Registration,
    RegistrationWarning,
};
pub use syntax::{ArgumentSpec, Arguments, ParsedArgument, Syntax, split_tokens, tokenize};
pub use types::{TypeMatcher, TypeRegistry, TypedValue};

pub use tower::BoxError;
