//! Guild entities and the lookup context used by argument matchers.
//!
//! A [`GuildLookup`] resolves channels, members and roles either by exact id
//! or by exact display name. Matchers try the id first and fall back to the
//! name; see `sparkl_framework::types`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::id::Snowflake;

/// A text channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: Snowflake,
    pub name: String,
}

/// A guild member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// User id of the member.
    pub id: Snowflake,
    /// Account name.
    pub username: String,
    /// Guild-specific nickname, if set.
    #[serde(default)]
    pub nickname: Option<String>,
    /// Role ids held in the guild.
    #[serde(default)]
    pub roles: Vec<Snowflake>,
}

impl Member {
    /// Name shown in the guild: the nickname if set, else the username.
    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.username)
    }
}

/// A guild role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: Snowflake,
    pub name: String,
}

/// Read-only view of one guild's channels, members and roles.
///
/// Implementations are expected to answer from a local cache; lookups are
/// synchronous.
pub trait GuildLookup: Send + Sync {
    /// Id of the guild this lookup covers.
    fn guild_id(&self) -> Snowflake;

    fn channel(&self, id: Snowflake) -> Option<Channel>;

    fn channel_by_name(&self, name: &str) -> Option<Channel>;

    fn member(&self, id: Snowflake) -> Option<Member>;

    /// Finds a member whose display name or username equals `name`.
    fn member_by_name(&self, name: &str) -> Option<Member>;

    fn role(&self, id: Snowflake) -> Option<Role>;

    fn role_by_name(&self, name: &str) -> Option<Role>;
}

/// In-memory [`GuildLookup`] built from plain collections.
///
/// Name lookups return the first entry inserted with that name.
///
/// # Example
///
/// ```rust
/// use sparkl_core::{GuildLookup, GuildSnapshot, Snowflake};
///
/// let guild = GuildSnapshot::new(1u64)
///     .with_channel(10u64, "general")
///     .with_role(20u64, "moderator");
///
/// assert_eq!(guild.channel_by_name("general").unwrap().id, Snowflake::new(10));
/// ```
#[derive(Debug, Clone, Default)]
pub struct GuildSnapshot {
    id: Snowflake,
    channels: Vec<Channel>,
    members: Vec<Member>,
    roles: Vec<Role>,
    channel_index: HashMap<Snowflake, usize>,
    member_index: HashMap<Snowflake, usize>,
    role_index: HashMap<Snowflake, usize>,
}

impl GuildSnapshot {
    /// Creates an empty snapshot for `id`.
    pub fn new(id: impl Into<Snowflake>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Adds a channel.
    pub fn with_channel(mut self, id: impl Into<Snowflake>, name: impl Into<String>) -> Self {
        self.insert_channel(Channel {
            id: id.into(),
            name: name.into(),
        });
        self
    }

    /// Adds a role.
    pub fn with_role(mut self, id: impl Into<Snowflake>, name: impl Into<String>) -> Self {
        self.insert_role(Role {
            id: id.into(),
            name: name.into(),
        });
        self
    }

    /// Adds a member.
    pub fn with_member(mut self, member: Member) -> Self {
        self.insert_member(member);
        self
    }

    /// Inserts or replaces a channel.
    pub fn insert_channel(&mut self, channel: Channel) {
        match self.channel_index.get(&channel.id) {
            Some(&i) => self.channels[i] = channel,
            None => {
                self.channel_index.insert(channel.id, self.channels.len());
                self.channels.push(channel);
            }
        }
    }

    /// Inserts or replaces a member.
    pub fn insert_member(&mut self, member: Member) {
        match self.member_index.get(&member.id) {
            Some(&i) => self.members[i] = member,
            None => {
                self.member_index.insert(member.id, self.members.len());
                self.members.push(member);
            }
        }
    }

    /// Inserts or replaces a role.
    pub fn insert_role(&mut self, role: Role) {
        match self.role_index.get(&role.id) {
            Some(&i) => self.roles[i] = role,
            None => {
                self.role_index.insert(role.id, self.roles.len());
                self.roles.push(role);
            }
        }
    }
}

impl GuildLookup for GuildSnapshot {
    fn guild_id(&self) -> Snowflake {
        self.id
    }

    fn channel(&self, id: Snowflake) -> Option<Channel> {
        self.channel_index
            .get(&id)
            .map(|&i| self.channels[i].clone())
    }

    fn channel_by_name(&self, name: &str) -> Option<Channel> {
        self.channels.iter().find(|c| c.name == name).cloned()
    }

    fn member(&self, id: Snowflake) -> Option<Member> {
        self.member_index.get(&id).map(|&i| self.members[i].clone())
    }

    fn member_by_name(&self, name: &str) -> Option<Member> {
        self.members
            .iter()
            .find(|m| m.display_name() == name || m.username == name)
            .cloned()
    }

    fn role(&self, id: Snowflake) -> Option<Role> {
        self.role_index.get(&id).map(|&i| self.roles[i].clone())
    }

    fn role_by_name(&self, name: &str) -> Option<Role> {
        self.roles.iter().find(|r| r.name == name).cloned()
    }
}
