//! Integration layer - interfaces implemented outside the engine.
//!
//! - [`ChatClient`]: the chat transport (replies and guild lookups)
//! - [`ConfigProvider`]: per-guild prefix and permission settings

pub mod client;
pub mod config;

pub use client::{BoxedClient, ChatClient};
pub use config::{
    BoxedConfigProvider, ConfigProvider, DEFAULT_PREFIX, GuildConfig, PermissionConfig,
    StaticConfigProvider,
};
