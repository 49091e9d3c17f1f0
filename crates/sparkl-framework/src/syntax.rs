//! Argument declarations and the tokenizer that validates them.
//!
//! A command declares an ordered list of [`ArgumentSpec`]s wrapped in a
//! [`Syntax`]. [`tokenize`] walks that list against the whitespace-separated
//! tokens that follow the command name:
//!
//! - a **rest** argument consumes every remaining token, re-joined with single
//!   spaces, and must be last
//! - a missing **required** argument is a `MISSING_ARGUMENT` error
//! - a missing **optional** argument is recorded as absent
//! - the first matcher failure aborts with `PARSE_FAILED`; later arguments are
//!   never attempted
//! - surplus tokens after the last argument are ignored
//!
//! # Example
//!
//! ```rust,ignore
//! let syntax = Syntax::new(vec![
//!     ArgumentSpec::required("user", "member"),
//!     ArgumentSpec::optional("reason", "string").rest(),
//! ])?;
//!
//! let args = tokenize(&syntax, "<@42> being rude", &types, &guild)?;
//! assert_eq!(args.str("reason"), Some("being rude"));
//! ```

use serde::{Deserialize, Serialize};
use tracing::trace;

use sparkl_core::{Channel, GuildLookup, Member, Role};

use crate::error::{ParseError, SyntaxError};
use crate::types::{TypeRegistry, TypedValue};

// =============================================================================
// Declarations
// =============================================================================

/// One declared argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentSpec {
    /// Name used for named lookup and in error replies.
    pub name: String,
    /// Key into the [`TypeRegistry`].
    pub type_name: String,
    /// Whether the argument must be supplied.
    #[serde(default = "default_required")]
    pub required: bool,
    /// Whether the argument swallows the rest of the input.
    #[serde(default)]
    pub rest: bool,
}

fn default_required() -> bool {
    true
}

impl ArgumentSpec {
    pub fn required(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            required: true,
            rest: false,
        }
    }

    pub fn optional(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(name, type_name)
        }
    }

    /// Marks this argument as consuming all remaining tokens.
    pub fn rest(mut self) -> Self {
        self.rest = true;
        self
    }
}

/// A validated, ordered list of argument declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Syntax {
    args: Vec<ArgumentSpec>,
}

impl Syntax {
    /// Validates and wraps `args`.
    ///
    /// Fails if a rest argument is not last, if two arguments share a name, or
    /// if a name is empty.
    pub fn new(args: Vec<ArgumentSpec>) -> Result<Self, SyntaxError> {
        for (i, arg) in args.iter().enumerate() {
            if arg.name.is_empty() {
                return Err(SyntaxError::EmptyName);
            }
            if arg.rest && i + 1 != args.len() {
                return Err(SyntaxError::RestNotLast(arg.name.clone()));
            }
            if args[..i].iter().any(|prev| prev.name == arg.name) {
                return Err(SyntaxError::DuplicateArgument(arg.name.clone()));
            }
        }
        Ok(Self { args })
    }

    /// A syntax with no arguments.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn args(&self) -> &[ArgumentSpec] {
        &self.args
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Human-readable usage, e.g. `<user:member> [reason:string...]`.
    pub fn usage(&self) -> String {
        self.args
            .iter()
            .map(|arg| {
                let dots = if arg.rest { "..." } else { "" };
                if arg.required {
                    format!("<{}:{}{dots}>", arg.name, arg.type_name)
                } else {
                    format!("[{}:{}{dots}]", arg.name, arg.type_name)
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// =============================================================================
// Parsed arguments
// =============================================================================

/// One parsed argument: the converted value and the raw text it came from.
///
/// Both are `None` for an omitted optional argument.
#[derive(Debug, Clone)]
pub struct ParsedArgument {
    pub value: Option<TypedValue>,
    pub raw: Option<String>,
}

impl ParsedArgument {
    fn absent() -> Self {
        Self {
            value: None,
            raw: None,
        }
    }
}

/// Positional argument values, one per declared argument.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    names: Vec<String>,
    entries: Vec<ParsedArgument>,
}

impl Arguments {
    /// Positional entry `index`.
    pub fn get(&self, index: usize) -> Option<&ParsedArgument> {
        self.entries.get(index)
    }

    /// Positional value `index`, `None` if absent.
    pub fn value(&self, index: usize) -> Option<&TypedValue> {
        self.entries.get(index)?.value.as_ref()
    }

    /// Value of the argument declared as `name`.
    pub fn named(&self, name: &str) -> Option<&TypedValue> {
        let index = self.names.iter().position(|n| n == name)?;
        self.value(index)
    }

    /// Raw token text of the argument declared as `name`.
    pub fn raw(&self, name: &str) -> Option<&str> {
        let index = self.names.iter().position(|n| n == name)?;
        self.entries.get(index)?.raw.as_deref()
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.named(name)?.as_str()
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        self.named(name)?.as_integer()
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.named(name)?.as_number()
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        self.named(name)?.as_bool()
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.named(name)?.as_channel()
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.named(name)?.as_member()
    }

    pub fn role(&self, name: &str) -> Option<&Role> {
        self.named(name)?.as_role()
    }

    /// `(name, entry)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParsedArgument)> {
        self.names.iter().map(String::as_str).zip(self.entries.iter())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consumes the arguments, yielding the positional values.
    pub fn into_values(self) -> Vec<Option<TypedValue>> {
        self.entries.into_iter().map(|e| e.value).collect()
    }
}

// =============================================================================
// Tokenizer
// =============================================================================

/// Splits command input on runs of whitespace.
pub fn split_tokens(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Matches `tokens` against `syntax`.
pub fn tokenize_tokens(
    syntax: &Syntax,
    tokens: &[&str],
    types: &TypeRegistry,
    guild: &dyn GuildLookup,
) -> Result<Arguments, ParseError> {
    let mut names = Vec::with_capacity(syntax.len());
    let mut entries = Vec::with_capacity(syntax.len());
    let mut cursor = 0;

    for spec in syntax.args() {
        let token = if spec.rest {
            let tail = tokens.get(cursor..).unwrap_or_default().join(" ");
            cursor = tokens.len();
            (!tail.is_empty()).then_some(tail)
        } else {
            let token = tokens.get(cursor).map(|t| t.to_string());
            cursor += 1;
            token
        };

        let entry = match token {
            None if spec.required => return Err(ParseError::missing(spec)),
            None => ParsedArgument::absent(),
            Some(token) => {
                let matcher = types
                    .get(&spec.type_name)
                    .ok_or_else(|| ParseError::unknown_type(spec, &token))?;
                let value = matcher
                    .match_token(guild, &token)
                    .map_err(|cause| ParseError::parse_failed(spec, &token, cause))?;
                ParsedArgument {
                    value: Some(value),
                    raw: Some(token),
                }
            }
        };

        names.push(spec.name.clone());
        entries.push(entry);
    }

    if cursor < tokens.len() {
        trace!(surplus = tokens.len() - cursor, "Ignoring surplus tokens");
    }

    Ok(Arguments { names, entries })
}

/// Splits `text` and matches the tokens against `syntax`.
pub fn tokenize(
    syntax: &Syntax,
    text: &str,
    types: &TypeRegistry,
    guild: &dyn GuildLookup,
) -> Result<Arguments, ParseError> {
    tokenize_tokens(syntax, &split_tokens(text), types, guild)
}
