//! Unified error types for the sparkl collaborators.
//!
//! Engine-level errors (parse, permission, dispatch) live in
//! `sparkl-framework`; this module only covers the boundary to the outside
//! world.

use thiserror::Error;

use super::id::Snowflake;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors raised by a [`ChatClient`](crate::ChatClient).
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The client is not connected.
    #[error("chat client is not connected")]
    NotConnected,

    /// Sending a message failed.
    #[error("failed to send message to channel {channel}: {reason}")]
    SendFailed {
        /// Target channel.
        channel: Snowflake,
        /// Reason for failure.
        reason: String,
    },

    /// The guild is unknown to the client.
    #[error("guild {0} is not available")]
    GuildUnavailable(Snowflake),

    /// Any other transport failure.
    #[error("transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// Creates a send failure for `channel`.
    pub fn send_failed(channel: Snowflake, reason: impl Into<String>) -> Self {
        Self::SendFailed {
            channel,
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Provider Errors
// =============================================================================

/// Errors raised by a [`ConfigProvider`](crate::ConfigProvider).
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The provider has not been initialised yet.
    #[error("config provider is not initialised")]
    NotInitialised,

    /// The backing store could not be read.
    #[error("failed to load config for guild {guild}: {reason}")]
    Unavailable {
        /// Guild whose config was requested.
        guild: Snowflake,
        /// Reason for failure.
        reason: String,
    },

    /// Any other provider failure.
    #[error("config provider error: {0}")]
    Other(String),
}

impl ProviderError {
    /// Creates an unavailable error for `guild`.
    pub fn unavailable(guild: Snowflake, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            guild,
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for config provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
