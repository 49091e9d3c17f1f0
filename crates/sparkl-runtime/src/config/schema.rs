//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use sparkl_core::{DEFAULT_PREFIX, GuildConfig, Snowflake, StaticConfigProvider};

use super::error::{ConfigError, ConfigResult};

/// Root configuration structure.
///
/// ```toml
/// [client]
/// prefix = "!"
///
/// [logging]
/// level = "debug"
///
/// [guilds.123456789]
/// prefix = "?"
/// permissions.users = { "42" = 10 }
///
/// [plugins.greeter]
/// greeting = "hi"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SparklConfig {
    /// Client-wide settings.
    #[serde(default)]
    pub client: ClientConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Static per-guild settings, keyed by guild id.
    #[serde(default)]
    pub guilds: HashMap<String, GuildConfig>,

    /// Raw plugin sections, keyed by plugin name.
    #[serde(default)]
    pub plugins: HashMap<String, serde_json::Value>,
}

impl SparklConfig {
    /// Settings for guilds without an entry in `guilds`.
    pub fn fallback_guild_config(&self) -> GuildConfig {
        GuildConfig::with_prefix(self.client.prefix.clone())
    }

    /// The `guilds` table with parsed ids.
    pub fn guild_configs(&self) -> ConfigResult<HashMap<Snowflake, GuildConfig>> {
        self.guilds
            .iter()
            .map(|(id, config)| {
                id.parse::<Snowflake>()
                    .map(|id| (id, config.clone()))
                    .map_err(|_| ConfigError::InvalidGuildId(id.clone()))
            })
            .collect()
    }

    /// Builds the in-memory provider serving `guilds` and the fallback.
    pub fn config_provider(&self) -> ConfigResult<StaticConfigProvider> {
        let provider = StaticConfigProvider::new(self.fallback_guild_config());
        for (id, config) in self.guild_configs()? {
            provider.set_guild_config(id, config);
        }
        Ok(provider)
    }

    /// The config section of `plugin`, `null` if absent.
    pub fn plugin_config(&self, plugin: &str) -> serde_json::Value {
        self.plugins
            .get(plugin)
            .cloned()
            .unwrap_or(serde_json::Value::Null)
    }
}

/// Client-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Prefix for guilds without their own.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Ignore messages sent by bot accounts.
    #[serde(default = "default_true")]
    pub ignore_bots: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            ignore_bots: true,
        }
    }
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Logging
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Global level.
    #[serde(default)]
    pub level: LogLevel,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Output destination.
    #[serde(default)]
    pub output: LogOutput,

    /// Span lifecycle events to log.
    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Include thread ids.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line.
    #[serde(default)]
    pub file_location: bool,

    /// Log file, required when `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// How often the log file is rotated.
    #[serde(default)]
    pub rotation: LogRotation,

    /// Rotated files to keep; 0 keeps all of them.
    #[serde(default = "default_max_files")]
    pub max_files: u32,

    /// Per-module levels, e.g. `sparkl_framework = "trace"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
            file_path: None,
            rotation: LogRotation::default(),
            max_files: default_max_files(),
            filters: HashMap::new(),
        }
    }
}

fn default_max_files() -> u32 {
    5
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    #[cfg(feature = "json-log")]
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Log file rotation period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Span events to log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SparklConfig::default();
        assert_eq!(config.client.prefix, "!");
        assert!(config.client.ignore_bots);
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.output, LogOutput::Stdout);
        assert_eq!(config.logging.max_files, 5);
    }

    #[test]
    fn test_guild_configs_parse_ids() {
        let mut config = SparklConfig::default();
        config
            .guilds
            .insert("42".into(), GuildConfig::with_prefix("?"));
        let guilds = config.guild_configs().unwrap();
        assert_eq!(guilds[&Snowflake::new(42)].prefix, "?");

        config.guilds.insert("general".into(), GuildConfig::default());
        assert!(matches!(
            config.guild_configs(),
            Err(ConfigError::InvalidGuildId(id)) if id == "general"
        ));
    }

    #[test]
    fn test_plugin_config_defaults_to_null() {
        let mut config = SparklConfig::default();
        config
            .plugins
            .insert("greeter".into(), serde_json::json!({ "greeting": "hi" }));
        assert_eq!(config.plugin_config("greeter")["greeting"], "hi");
        assert!(config.plugin_config("other").is_null());
    }
}
