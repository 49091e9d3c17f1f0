//! # sparkl
//!
//! A prefix-command engine for guild chat bots.
//!
//! ## Overview
//!
//! sparkl turns chat messages such as `!mod ban @alice being rude` into calls
//! of registered command handlers. It resolves the command (including grouped
//! commands and aliases), checks the author's permission level against the
//! guild's settings, converts the arguments to typed values and runs the
//! handler. Anything that is not a command is ignored silently.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌────────────┐     ┌─────────────┐
//! │ SparklClient │────▶│  Dispatcher  │────▶│  Registry  │────▶│   Handler   │
//! │  (messages)  │     │ prefix/perms │     │ best match │     │ typed args  │
//! └──────────────┘     └──────────────┘     └────────────┘     └─────────────┘
//! ```
//!
//! - **Core** ([`core`]): ids, messages, guild lookup and the collaborator traits
//! - **Framework** ([`framework`]): matchers, tokenizer, registry, permissions, dispatch
//! - **Runtime** ([`runtime`]): client facade, configuration and logging
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sparkl::prelude::*;
//!
//! async fn ping(ctx: CommandContext, _args: Arguments) -> HandlerResult {
//!     ctx.reply("pong").await?;
//!     Ok(())
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     sparkl::runtime::logging::init_from_config(&config.logging);
//!
//!     let client = SparklClient::from_config(my_chat_client(), &config)?;
//!     client.command(Command::new("ping", 0, Syntax::empty(), ping));
//!     client.run(my_message_stream()).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: load `sparkl.toml`
//! - `yaml-config`: load `sparkl.yaml`
//! - `json-log`: JSON log output

pub use sparkl_core as core;
pub use sparkl_framework as framework;
pub use sparkl_runtime as runtime;

pub use sparkl_runtime::{SparklClient, SparklConfig};

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use sparkl::prelude::*;
/// ```
pub mod prelude {
    // Client - main entry point
    pub use sparkl_runtime::SparklClient;
    pub use sparkl_runtime::config::{SparklConfig, load_config, load_config_from_file};

    // Commands - for declaring and handling commands
    pub use sparkl_framework::{
        ArgumentSpec, Arguments, BoxError, Command, CommandContext, CommandOptions, GuildScope,
        HandlerResult, Syntax, TypedValue,
    };

    // Plugins and listeners
    pub use sparkl_framework::{FnPlugin, Plugin, PluginScope};

    // Collaborator traits for custom implementations
    pub use sparkl_core::{
        Author, ChatClient, ConfigProvider, GuildConfig, GuildLookup, GuildSnapshot,
        InboundMessage, PermissionConfig, Snowflake, StaticConfigProvider,
    };
}
