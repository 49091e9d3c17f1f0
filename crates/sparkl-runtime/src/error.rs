//! Runtime error types.

use thiserror::Error;

use sparkl_core::ProviderError;
use sparkl_framework::{DispatchError, PluginError};

use crate::config::ConfigError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Loading or validating the configuration failed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Attaching or detaching a plugin failed.
    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),

    /// The config provider failed to initialise or answer.
    #[error("Config provider error: {0}")]
    Provider(#[from] ProviderError),

    /// A permission check could not be completed.
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
