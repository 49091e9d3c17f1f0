//! Error types for the sparkl framework.
//!
//! Every boundary of the engine returns one of these as a value:
//!
//! - [`MatchError`]: a type matcher could not convert a token
//! - [`ParseError`]: the tokenizer rejected the arguments ([`ParseErrorKind`])
//! - [`PermissionError`]: the invoker's effective level is too low
//! - [`DispatchError`]: why a matched command was rejected
//! - [`SyntaxError`] / [`PluginError`]: invalid declarations at registration

use std::fmt;

use thiserror::Error;
use tower::BoxError;

use sparkl_core::{ProviderError, TransportError};

use crate::syntax::ArgumentSpec;

/// Returned by a type matcher when a token cannot be converted.
///
/// The tokenizer wraps it into a [`ParseError`] that also names the argument.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct MatchError(pub String);

impl MatchError {
    /// Creates a match error with the given message.
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Discriminator of a [`ParseError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    /// A token could not be converted to the declared type.
    ParseFailed,
    /// A required argument was not supplied.
    MissingArgument,
}

impl ParseErrorKind {
    /// Stable upper-case code, e.g. `PARSE_FAILED`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParseFailed => "PARSE_FAILED",
            Self::MissingArgument => "MISSING_ARGUMENT",
        }
    }
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Argument validation failure produced by the tokenizer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ParseError {
    /// What went wrong.
    pub kind: ParseErrorKind,
    /// Human-readable description.
    pub message: String,
    /// The argument specification that failed.
    pub argument: ArgumentSpec,
    /// The token (or re-joined tail) that was received, if any.
    pub received: Option<String>,
}

impl ParseError {
    /// A required argument had no token left to consume.
    pub fn missing(argument: &ArgumentSpec) -> Self {
        Self {
            kind: ParseErrorKind::MissingArgument,
            message: format!("missing required argument `{}`", argument.name),
            argument: argument.clone(),
            received: None,
        }
    }

    /// A matcher rejected `received`.
    pub fn parse_failed(argument: &ArgumentSpec, received: &str, cause: MatchError) -> Self {
        Self {
            kind: ParseErrorKind::ParseFailed,
            message: cause.0,
            argument: argument.clone(),
            received: Some(received.to_string()),
        }
    }

    /// No matcher is registered for the argument's type.
    pub fn unknown_type(argument: &ArgumentSpec, received: &str) -> Self {
        Self {
            kind: ParseErrorKind::ParseFailed,
            message: format!("no matcher registered for type `{}`", argument.type_name),
            argument: argument.clone(),
            received: Some(received.to_string()),
        }
    }
}

/// The invoker's effective level is below the command's required level.
///
/// Carries both levels for logging; user-facing replies never include them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("not enough permission: required level {required}, received {received}")]
pub struct PermissionError {
    /// Level the command requires after overrides.
    pub required: u32,
    /// The invoker's effective level.
    pub received: u32,
}

/// Invalid argument declaration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    /// A `rest` argument is followed by another argument.
    #[error("rest argument `{0}` must be the last argument")]
    RestNotLast(String),

    /// Two arguments share a name.
    #[error("duplicate argument name `{0}`")]
    DuplicateArgument(String),

    /// An argument has an empty name.
    #[error("argument names must not be empty")]
    EmptyName,
}

/// Plugin lifecycle errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginError {
    /// A plugin with the same name is already attached.
    #[error("plugin '{0}' is already attached")]
    AlreadyAttached(String),

    /// No plugin with this name is attached.
    #[error("plugin '{0}' is not attached")]
    NotAttached(String),

    /// The plugin's attach hook returned an error.
    #[error("plugin '{name}' failed to attach: {reason}")]
    AttachFailed { name: String, reason: String },
}

/// Why a matched command did not run to completion.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The invoker lacks the required level.
    #[error(transparent)]
    Permission(#[from] PermissionError),

    /// The arguments did not satisfy the command's syntax.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The chat client failed after the command was matched.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The config provider failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The handler returned an error.
    #[error("command handler failed: {0}")]
    Handler(BoxError),

    /// The handler panicked.
    #[error("command handler panicked: {0}")]
    Panicked(String),
}
