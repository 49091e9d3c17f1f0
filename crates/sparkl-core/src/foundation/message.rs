//! Inbound chat messages.

use serde::{Deserialize, Serialize};

use super::id::Snowflake;

/// The user who sent a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// User id.
    pub id: Snowflake,
    /// Account name.
    pub name: String,
    /// Whether the account is an automated bot account.
    #[serde(default)]
    pub bot: bool,
}

impl Author {
    /// Creates a human author.
    pub fn new(id: impl Into<Snowflake>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            bot: false,
        }
    }

    /// Marks the author as a bot account.
    pub fn bot(mut self) -> Self {
        self.bot = true;
        self
    }
}

/// A text message delivered by the chat transport.
///
/// The engine only ever reads these fields; it never mutates a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Message id.
    pub id: Snowflake,
    /// Raw message content.
    pub content: String,
    /// Sender.
    pub author: Author,
    /// Guild the message was posted in, if any.
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    /// Channel the message was posted in.
    pub channel_id: Snowflake,
    /// Role ids the sender holds in the guild.
    #[serde(default)]
    pub member_roles: Vec<Snowflake>,
}

impl InboundMessage {
    /// Creates a message without guild membership information.
    pub fn new(
        id: impl Into<Snowflake>,
        channel_id: impl Into<Snowflake>,
        author: Author,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            author,
            guild_id: None,
            channel_id: channel_id.into(),
            member_roles: Vec::new(),
        }
    }

    /// Sets the guild the message was posted in.
    pub fn in_guild(mut self, guild_id: impl Into<Snowflake>) -> Self {
        self.guild_id = Some(guild_id.into());
        self
    }

    /// Sets the sender's role ids.
    pub fn with_roles(mut self, roles: impl IntoIterator<Item = Snowflake>) -> Self {
        self.member_roles = roles.into_iter().collect();
        self
    }

    /// Returns `true` if the sender holds `role`.
    pub fn has_role(&self, role: Snowflake) -> bool {
        self.member_roles.contains(&role)
    }
}
