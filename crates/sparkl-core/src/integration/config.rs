//! Per-guild configuration and the provider trait that serves it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::foundation::{ProviderResult, Snowflake};

/// Prefix used when a guild has not configured one.
pub const DEFAULT_PREFIX: &str = "!";

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

/// Permission maps for a single guild.
///
/// All maps are optional in serialized form and default to empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionConfig {
    /// Command name → required level, replacing the command's own level.
    #[serde(default)]
    pub command_permission_overrides: HashMap<String, u32>,

    /// User id → level.
    #[serde(default)]
    pub users: HashMap<Snowflake, u32>,

    /// Role id → level.
    #[serde(default)]
    pub roles: HashMap<Snowflake, u32>,
}

impl PermissionConfig {
    /// Sets the required level for `command`, overriding its declared level.
    pub fn with_override(mut self, command: impl Into<String>, level: u32) -> Self {
        self.command_permission_overrides
            .insert(command.into(), level);
        self
    }

    /// Grants `level` to a user.
    pub fn with_user(mut self, user: impl Into<Snowflake>, level: u32) -> Self {
        self.users.insert(user.into(), level);
        self
    }

    /// Grants `level` to every holder of a role.
    pub fn with_role(mut self, role: impl Into<Snowflake>, level: u32) -> Self {
        self.roles.insert(role.into(), level);
        self
    }
}

/// Settings for a single guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildConfig {
    /// Command prefix.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Permission maps.
    #[serde(default)]
    pub permissions: PermissionConfig,
}

impl Default for GuildConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            permissions: PermissionConfig::default(),
        }
    }
}

impl GuildConfig {
    /// Creates a config with the given prefix and no permissions.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Default::default()
        }
    }

    /// Replaces the permission maps.
    pub fn permissions(mut self, permissions: PermissionConfig) -> Self {
        self.permissions = permissions;
        self
    }
}

/// Source of per-guild settings.
///
/// The engine treats each `fetch_guild_config` result as authoritative at
/// call time; providers are free to cache.
#[async_trait]
pub trait ConfigProvider: Send + Sync + 'static {
    /// Called once when the client starts, before any message is handled.
    async fn init(&self) -> ProviderResult<()> {
        Ok(())
    }

    /// Returns the settings for `guild`.
    async fn fetch_guild_config(&self, guild: Snowflake) -> ProviderResult<GuildConfig>;
}

/// Type alias for a shared config provider.
pub type BoxedConfigProvider = Arc<dyn ConfigProvider>;

/// In-memory provider: one fallback config plus per-guild entries.
///
/// This is the provider a client uses until another one is installed.
#[derive(Debug, Default)]
pub struct StaticConfigProvider {
    fallback: GuildConfig,
    guilds: RwLock<HashMap<Snowflake, GuildConfig>>,
}

impl StaticConfigProvider {
    /// Creates a provider that answers `fallback` for unknown guilds.
    pub fn new(fallback: GuildConfig) -> Self {
        Self {
            fallback,
            guilds: RwLock::new(HashMap::new()),
        }
    }

    /// Adds a guild entry (builder pattern).
    pub fn with_guild(self, guild: impl Into<Snowflake>, config: GuildConfig) -> Self {
        self.set_guild_config(guild, config);
        self
    }

    /// Inserts or replaces the settings for `guild`.
    pub fn set_guild_config(&self, guild: impl Into<Snowflake>, config: GuildConfig) {
        let guild = guild.into();
        debug!(guild = %guild, prefix = %config.prefix, "Guild config updated");
        self.guilds.write().insert(guild, config);
    }

    /// Returns the config used for guilds without an entry.
    pub fn fallback(&self) -> &GuildConfig {
        &self.fallback
    }
}

#[async_trait]
impl ConfigProvider for StaticConfigProvider {
    async fn fetch_guild_config(&self, guild: Snowflake) -> ProviderResult<GuildConfig> {
        Ok(self
            .guilds
            .read()
            .get(&guild)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guild_config_defaults_when_fields_missing() {
        let config: GuildConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.prefix, DEFAULT_PREFIX);
        assert!(config.permissions.users.is_empty());
    }

    #[test]
    fn test_permission_config_deserializes_string_keys() {
        let json = r#"{
            "command_permission_overrides": { "ban": 1 },
            "users": { "100": 4 },
            "roles": { "200": 7 }
        }"#;
        let perms: PermissionConfig = serde_json::from_str(json).unwrap();
        assert_eq!(perms.command_permission_overrides["ban"], 1);
        assert_eq!(perms.users[&Snowflake::new(100)], 4);
        assert_eq!(perms.roles[&Snowflake::new(200)], 7);
    }

    #[tokio::test]
    async fn test_static_provider_falls_back() {
        let provider = StaticConfigProvider::new(GuildConfig::with_prefix("?"))
            .with_guild(1u64, GuildConfig::with_prefix("$"));

        let known = provider.fetch_guild_config(Snowflake::new(1)).await.unwrap();
        let unknown = provider.fetch_guild_config(Snowflake::new(2)).await.unwrap();

        assert_eq!(known.prefix, "$");
        assert_eq!(unknown.prefix, "?");
    }
}
