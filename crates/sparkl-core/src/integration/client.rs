//! Chat client trait.
//!
//! The chat client is the transport: it delivers [`InboundMessage`]s to the
//! runtime (as a stream, see `sparkl_runtime::SparklClient::run`) and is the
//! only way the engine talks back to users.
//!
//! [`InboundMessage`]: crate::InboundMessage

use std::sync::Arc;

use async_trait::async_trait;

use crate::foundation::{GuildLookup, Snowflake, TransportResult};

/// The transport the engine replies through.
///
/// # Example
///
/// ```rust,ignore
/// struct StdoutClient { guild: Arc<GuildSnapshot> }
///
/// #[async_trait]
/// impl ChatClient for StdoutClient {
///     async fn send(&self, channel: Snowflake, content: &str) -> TransportResult<()> {
///         println!("[#{channel}] {content}");
///         Ok(())
///     }
///
///     async fn guild(&self, _id: Snowflake) -> TransportResult<Arc<dyn GuildLookup>> {
///         Ok(self.guild.clone())
///     }
/// }
/// ```
#[async_trait]
pub trait ChatClient: Send + Sync + 'static {
    /// Sends a text message to `channel`.
    async fn send(&self, channel: Snowflake, content: &str) -> TransportResult<()>;

    /// Returns a lookup context for `guild`.
    ///
    /// May hit the network on a cache miss.
    async fn guild(&self, guild: Snowflake) -> TransportResult<Arc<dyn GuildLookup>>;
}

/// Type alias for a shared chat client.
pub type BoxedClient = Arc<dyn ChatClient>;
