//! Configuration module for the sparkl runtime.
//!
//! This module provides figment-based loading and validation for the client
//! settings, logging, static per-guild settings and plugin sections.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    ClientConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, SparklConfig,
    SpanEventConfig,
};
pub use validation::validate_config;
