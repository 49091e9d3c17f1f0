//! # sparkl Core
//!
//! Foundation types shared by every sparkl crate, and the traits describing
//! the collaborators the command engine talks to.
//!
//! ## Architecture Layers
//!
//! ### Foundation Layer
//!
//! Plain data with no behaviour beyond lookup:
//! - **Identifiers**: [`Snowflake`], the opaque numeric id used for users,
//!   guilds, channels and roles
//! - **Messages**: [`InboundMessage`] and its [`Author`]
//! - **Guild lookup**: [`GuildLookup`] plus the in-memory [`GuildSnapshot`]
//!
//! ### Integration Layer
//!
//! Interfaces implemented outside the engine:
//! - **Chat client**: sends replies and resolves guilds ([`ChatClient`])
//! - **Config provider**: supplies per-guild prefix and permissions
//!   ([`ConfigProvider`], [`GuildConfig`], [`PermissionConfig`])
//!
//! ```text
//! ┌──────────────┐   InboundMessage   ┌────────────┐   fetch_guild_config   ┌────────────────┐
//! │  ChatClient  │───────────────────▶│   Engine   │───────────────────────▶│ ConfigProvider │
//! │ (transport)  │◀───────────────────│            │                        └────────────────┘
//! └──────────────┘   send / guild()   └────────────┘
//! ```

pub mod foundation;
pub mod integration;

pub use foundation::{
    Author, Channel, GuildLookup, GuildSnapshot, InboundMessage, Member, ProviderError,
    ProviderResult, Role, Snowflake, SnowflakeParseError, TransportError, TransportResult,
};

pub use integration::{
    BoxedClient, BoxedConfigProvider, ChatClient, ConfigProvider, DEFAULT_PREFIX, GuildConfig,
    PermissionConfig, StaticConfigProvider,
};

/// Prelude for common imports.
pub mod prelude {
    pub use super::foundation::*;
    pub use super::integration::*;
}
