//! sparkl Runtime - the client layer of the sparkl command engine.
//!
//! This crate provides:
//! - The client facade that feeds inbound messages to the engine ([`SparklClient`])
//! - figment-based configuration loading and validation ([`config`])
//! - tracing subscriber setup driven by configuration ([`logging`])
//!
//! ```ignore
//! use sparkl_runtime::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     sparkl_runtime::logging::init_from_config(&config.logging);
//!
//!     let client = SparklClient::from_config(my_chat_client(), &config)?;
//!     client.command(Command::new("ping", 0, Syntax::empty(), ping));
//!
//!     // Run until the stream ends or Ctrl+C
//!     client.run(my_message_stream()).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod logging;

// Re-exports
pub use client::SparklClient;
pub use config::{
    ConfigError, ConfigLoader, ConfigResult, SparklConfig, load_config, load_config_from_file,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::client::SparklClient;
    pub use crate::config::{SparklConfig, load_config, load_config_from_file};
    pub use crate::error::{RuntimeError, RuntimeResult};
    pub use sparkl_core::prelude::*;
    pub use sparkl_framework::{
        ArgumentSpec, Arguments, BoxError, Command, CommandContext, CommandOptions, FnPlugin,
        HandlerResult, Plugin, PluginScope, Syntax,
    };
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
