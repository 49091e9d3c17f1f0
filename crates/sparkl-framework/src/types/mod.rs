//! Type matchers: converting raw tokens into typed argument values.
//!
//! A [`TypeMatcher`] is a pure function from a token (plus a read-only
//! [`GuildLookup`]) to a [`TypedValue`]. Matchers are stored in a
//! [`TypeRegistry`] keyed by the `type_name` used in argument specifications,
//! so new kinds are added by registering an entry, never by editing the
//! built-in ones.
//!
//! # Example
//!
//! ```rust,ignore
//! use sparkl_framework::types::{TypeRegistry, TypedValue};
//! use sparkl_framework::MatchError;
//!
//! let mut types = TypeRegistry::with_builtins();
//!
//! // Plain functions are matchers too.
//! types.register_fn("percent", |_guild, token| {
//!     token
//!         .strip_suffix('%')
//!         .and_then(|n| n.parse::<f64>().ok())
//!         .map(|n| TypedValue::Number(n / 100.0))
//!         .ok_or_else(|| MatchError::new(format!("`{token}` is not a percentage")))
//! });
//! ```

pub mod builtin;

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use sparkl_core::{Channel, GuildLookup, Member, Role};

use crate::error::MatchError;

pub use builtin::{
    BOOLEAN, BooleanType, CHANNEL, ChannelType, INTEGER, IntegerType, MEMBER, MemberType, NUMBER,
    NumberType, ROLE, RoleType, STRING, StringType,
};

/// A converted argument value.
#[derive(Debug, Clone)]
pub enum TypedValue {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    Channel(Channel),
    Member(Member),
    Role(Role),
    /// Value produced by a user-registered matcher.
    Custom(Arc<dyn Any + Send + Sync>),
}

impl TypedValue {
    /// Wraps an arbitrary value produced by a custom matcher.
    pub fn custom<T: Any + Send + Sync>(value: T) -> Self {
        Self::Custom(Arc::new(value))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the value as a float; integers are widened.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_channel(&self) -> Option<&Channel> {
        match self {
            Self::Channel(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_member(&self) -> Option<&Member> {
        match self {
            Self::Member(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_role(&self) -> Option<&Role> {
        match self {
            Self::Role(r) => Some(r),
            _ => None,
        }
    }

    /// Downcasts a [`TypedValue::Custom`] payload.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Custom(value) => value.downcast_ref::<T>(),
            _ => None,
        }
    }
}

/// Converts one token into one typed value.
///
/// Implementations must be pure: no I/O, no shared mutable state. Failures
/// are returned, never panicked.
pub trait TypeMatcher: Send + Sync + 'static {
    fn match_token(&self, guild: &dyn GuildLookup, token: &str) -> Result<TypedValue, MatchError>;
}

impl<F> TypeMatcher for F
where
    F: Fn(&dyn GuildLookup, &str) -> Result<TypedValue, MatchError> + Send + Sync + 'static,
{
    fn match_token(&self, guild: &dyn GuildLookup, token: &str) -> Result<TypedValue, MatchError> {
        self(guild, token)
    }
}

/// Table of matchers keyed by type name.
#[derive(Clone)]
pub struct TypeRegistry {
    matchers: HashMap<String, Arc<dyn TypeMatcher>>,
}

impl TypeRegistry {
    /// Creates a registry with no matchers.
    pub fn empty() -> Self {
        Self {
            matchers: HashMap::new(),
        }
    }

    /// Creates a registry holding every built-in kind.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(STRING, StringType);
        registry.register(INTEGER, IntegerType);
        registry.register(NUMBER, NumberType);
        registry.register(BOOLEAN, BooleanType);
        registry.register(CHANNEL, ChannelType);
        registry.register(MEMBER, MemberType);
        registry.register(ROLE, RoleType);
        registry
    }

    /// Registers `matcher` under `type_name`.
    ///
    /// Replacing an existing entry is allowed and logged.
    pub fn register(&mut self, type_name: impl Into<String>, matcher: impl TypeMatcher) {
        let type_name = type_name.into();
        if self
            .matchers
            .insert(type_name.clone(), Arc::new(matcher))
            .is_some()
        {
            warn!(type_name = %type_name, "Type matcher replaced");
        } else {
            debug!(type_name = %type_name, "Type matcher registered");
        }
    }

    /// Registers a plain function under `type_name`.
    pub fn register_fn<F>(&mut self, type_name: impl Into<String>, f: F)
    where
        F: Fn(&dyn GuildLookup, &str) -> Result<TypedValue, MatchError> + Send + Sync + 'static,
    {
        self.register(type_name, f);
    }

    /// Returns the matcher for `type_name`.
    pub fn get(&self, type_name: &str) -> Option<Arc<dyn TypeMatcher>> {
        self.matchers.get(type_name).cloned()
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.matchers.contains_key(type_name)
    }

    /// Registered type names, in no particular order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.matchers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.type_names().collect();
        names.sort_unstable();
        f.debug_struct("TypeRegistry")
            .field("types", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sparkl_core::GuildSnapshot;

    #[test]
    fn test_builtins_registered() {
        let types = TypeRegistry::with_builtins();
        for name in [STRING, INTEGER, NUMBER, BOOLEAN, CHANNEL, MEMBER, ROLE] {
            assert!(types.contains(name), "missing builtin {name}");
        }
        assert_eq!(types.len(), 7);
    }

    #[test]
    fn test_function_matcher() {
        #[derive(Debug, PartialEq)]
        struct Percent(f64);

        let mut types = TypeRegistry::empty();
        types.register_fn("percent", |_, token| {
            token
                .strip_suffix('%')
                .and_then(|n| n.parse::<f64>().ok())
                .map(|n| TypedValue::custom(Percent(n)))
                .ok_or_else(|| MatchError::new(format!("`{token}` is not a percentage")))
        });

        let guild = GuildSnapshot::new(1u64);
        let matcher = types.get("percent").unwrap();

        let value = matcher.match_token(&guild, "50%").unwrap();
        assert_eq!(value.downcast_ref::<Percent>(), Some(&Percent(50.0)));
        assert!(matcher.match_token(&guild, "fifty").is_err());
    }

    #[test]
    fn test_register_replaces_existing() {
        let mut types = TypeRegistry::with_builtins();
        types.register_fn(STRING, |_, token| Ok(TypedValue::String(token.to_uppercase())));

        let guild = GuildSnapshot::new(1u64);
        let value = types
            .get(STRING)
            .unwrap()
            .match_token(&guild, "loud")
            .unwrap();
        assert_eq!(value.as_str(), Some("LOUD"));
        assert_eq!(types.len(), 7);
    }

    #[test]
    fn test_integer_widens_to_number() {
        assert_eq!(TypedValue::Integer(3).as_number(), Some(3.0));
        assert_eq!(TypedValue::String("3".into()).as_number(), None);
    }
}
