//! Per-invocation context handed to command handlers.

use std::fmt;
use std::sync::Arc;

use sparkl_core::{
    Author, BoxedClient, GuildConfig, GuildLookup, InboundMessage, Snowflake, TransportResult,
};

use crate::command::Command;

/// Everything a handler may need about the message that invoked it.
///
/// Cheap to clone: every field is shared.
#[derive(Clone)]
pub struct CommandContext {
    message: Arc<InboundMessage>,
    guild: Arc<dyn GuildLookup>,
    client: BoxedClient,
    command: Arc<Command>,
    invoked_as: String,
    config: Arc<GuildConfig>,
}

impl CommandContext {
    pub fn new(
        message: Arc<InboundMessage>,
        guild: Arc<dyn GuildLookup>,
        client: BoxedClient,
        command: Arc<Command>,
        invoked_as: impl Into<String>,
        config: Arc<GuildConfig>,
    ) -> Self {
        Self {
            message,
            guild,
            client,
            command,
            invoked_as: invoked_as.into(),
            config,
        }
    }

    pub fn message(&self) -> &InboundMessage {
        &self.message
    }

    pub fn author(&self) -> &Author {
        &self.message.author
    }

    pub fn channel_id(&self) -> Snowflake {
        self.message.channel_id
    }

    pub fn guild(&self) -> &dyn GuildLookup {
        self.guild.as_ref()
    }

    pub fn client(&self) -> &BoxedClient {
        &self.client
    }

    /// The matched command.
    pub fn command(&self) -> &Command {
        &self.command
    }

    /// The token that matched: the command name or one of its aliases.
    pub fn invoked_as(&self) -> &str {
        &self.invoked_as
    }

    /// The guild settings that were in effect for this message.
    pub fn config(&self) -> &GuildConfig {
        &self.config
    }

    /// Sends `content` to the channel the message came from.
    pub async fn reply(&self, content: impl AsRef<str>) -> TransportResult<()> {
        self.client
            .send(self.message.channel_id, content.as_ref())
            .await
    }

    /// Sends `content` to another channel.
    pub async fn send_to(
        &self,
        channel: Snowflake,
        content: impl AsRef<str>,
    ) -> TransportResult<()> {
        self.client.send(channel, content.as_ref()).await
    }
}

impl fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContext")
            .field("message", &self.message.id)
            .field("guild", &self.guild.guild_id())
            .field("command", &self.command.path())
            .field("invoked_as", &self.invoked_as)
            .finish_non_exhaustive()
    }
}
