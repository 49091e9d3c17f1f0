//! Built-in type matchers.
//!
//! Reference kinds (channel, member, role) share one resolution rule:
//!
//! 1. A mention (`<#id>`, `<@id>`, `<@!id>`, `<@&id>`) yields its id; a bare
//!    integer literal is taken as the id itself. Any other token fails with
//!    "could not parse".
//! 2. Look the id up exactly. On a miss, look the raw token up by exact name.
//!    Integer literals that are not valid ids (negative, too large) go
//!    straight to the name lookup.
//! 3. If both miss, fail with "could not find".

use sparkl_core::{GuildLookup, Snowflake};

use super::{TypeMatcher, TypedValue};
use crate::error::MatchError;

pub const STRING: &str = "string";
pub const INTEGER: &str = "integer";
pub const NUMBER: &str = "number";
pub const BOOLEAN: &str = "boolean";
pub const CHANNEL: &str = "channel";
pub const MEMBER: &str = "member";
pub const ROLE: &str = "role";

fn parse_failed(token: &str, type_name: &str) -> MatchError {
    MatchError::new(format!("could not parse `{token}` to type `{type_name}`"))
}

/// Extracts the id a token refers to, if it is a mention or an integer.
pub fn reference_candidate(token: &str) -> Option<Snowflake> {
    match token.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
        Some(inner) => inner.trim_start_matches(['@', '#', '!', '&']).parse().ok(),
        None => token.parse().ok(),
    }
}

fn is_integer_literal(token: &str) -> bool {
    let digits = token.strip_prefix('-').unwrap_or(token);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn resolve_reference<T>(
    token: &str,
    type_name: &str,
    by_id: impl FnOnce(Snowflake) -> Option<T>,
    by_name: impl FnOnce(&str) -> Option<T>,
) -> Result<T, MatchError> {
    let id = reference_candidate(token);
    if id.is_none() && !is_integer_literal(token) {
        return Err(parse_failed(token, type_name));
    }

    id.and_then(by_id)
        .or_else(|| by_name(token))
        .ok_or_else(|| MatchError::new(format!("could not find {type_name} `{token}`")))
}

/// Passes the token through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringType;

impl TypeMatcher for StringType {
    fn match_token(&self, _guild: &dyn GuildLookup, token: &str) -> Result<TypedValue, MatchError> {
        Ok(TypedValue::String(token.to_string()))
    }
}

/// Signed 64-bit integer.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerType;

impl TypeMatcher for IntegerType {
    fn match_token(&self, _guild: &dyn GuildLookup, token: &str) -> Result<TypedValue, MatchError> {
        token
            .parse::<i64>()
            .map(TypedValue::Integer)
            .map_err(|_| parse_failed(token, INTEGER))
    }
}

/// Finite floating point number.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberType;

impl TypeMatcher for NumberType {
    fn match_token(&self, _guild: &dyn GuildLookup, token: &str) -> Result<TypedValue, MatchError> {
        token
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(TypedValue::Number)
            .ok_or_else(|| parse_failed(token, NUMBER))
    }
}

/// `true/false`, `yes/no`, `on/off`, `1/0`, case-insensitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanType;

impl TypeMatcher for BooleanType {
    fn match_token(&self, _guild: &dyn GuildLookup, token: &str) -> Result<TypedValue, MatchError> {
        match token.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(TypedValue::Boolean(true)),
            "false" | "no" | "off" | "0" => Ok(TypedValue::Boolean(false)),
            _ => Err(parse_failed(token, BOOLEAN)),
        }
    }
}

/// A channel of the current guild.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelType;

impl TypeMatcher for ChannelType {
    fn match_token(&self, guild: &dyn GuildLookup, token: &str) -> Result<TypedValue, MatchError> {
        resolve_reference(
            token,
            CHANNEL,
            |id| guild.channel(id),
            |name| guild.channel_by_name(name),
        )
        .map(TypedValue::Channel)
    }
}

/// A member of the current guild.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemberType;

impl TypeMatcher for MemberType {
    fn match_token(&self, guild: &dyn GuildLookup, token: &str) -> Result<TypedValue, MatchError> {
        resolve_reference(
            token,
            MEMBER,
            |id| guild.member(id),
            |name| guild.member_by_name(name),
        )
        .map(TypedValue::Member)
    }
}

/// A role of the current guild.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleType;

impl TypeMatcher for RoleType {
    fn match_token(&self, guild: &dyn GuildLookup, token: &str) -> Result<TypedValue, MatchError> {
        resolve_reference(token, ROLE, |id| guild.role(id), |name| guild.role_by_name(name))
            .map(TypedValue::Role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sparkl_core::{GuildSnapshot, Member};

    fn guild() -> GuildSnapshot {
        GuildSnapshot::new(1u64)
            .with_channel(10u64, "general")
            .with_channel(11u64, "2024")
            .with_role(20u64, "mods")
            .with_member(Member {
                id: Snowflake::new(30),
                username: "alice".into(),
                nickname: None,
                roles: vec![Snowflake::new(20)],
            })
    }

    #[test]
    fn test_reference_candidate() {
        assert_eq!(reference_candidate("<#10>"), Some(Snowflake::new(10)));
        assert_eq!(reference_candidate("<@30>"), Some(Snowflake::new(30)));
        assert_eq!(reference_candidate("<@!30>"), Some(Snowflake::new(30)));
        assert_eq!(reference_candidate("<@&20>"), Some(Snowflake::new(20)));
        assert_eq!(reference_candidate("42"), Some(Snowflake::new(42)));
        assert_eq!(reference_candidate("#general"), None);
        assert_eq!(reference_candidate("<#general>"), None);
    }

    #[test]
    fn test_channel_by_mention_and_id() {
        let guild = guild();
        let by_mention = ChannelType.match_token(&guild, "<#10>").unwrap();
        let by_id = ChannelType.match_token(&guild, "10").unwrap();
        assert_eq!(by_mention.as_channel().unwrap().name, "general");
        assert_eq!(by_id.as_channel().unwrap().name, "general");
    }

    #[test]
    fn test_channel_plain_name_cannot_be_parsed() {
        let err = ChannelType.match_token(&guild(), "#general").unwrap_err();
        assert_eq!(err.0, "could not parse `#general` to type `channel`");
    }

    #[test]
    fn test_channel_missing_id_reports_not_found() {
        let err = ChannelType.match_token(&guild(), "999").unwrap_err();
        assert_eq!(err.0, "could not find channel `999`");
    }

    #[test]
    fn test_channel_falls_back_to_name() {
        // no channel has id 2024, but one is named "2024"
        let value = ChannelType.match_token(&guild(), "2024").unwrap();
        assert_eq!(value.as_channel().unwrap().id, Snowflake::new(11));
    }

    #[test]
    fn test_out_of_range_integer_falls_back_to_name() {
        let guild = guild()
            .with_channel(13u64, "-5")
            .with_role(21u64, "99999999999999999999999");

        let channel = ChannelType.match_token(&guild, "-5").unwrap();
        assert_eq!(channel.as_channel().unwrap().id, Snowflake::new(13));
        let role = RoleType
            .match_token(&guild, "99999999999999999999999")
            .unwrap();
        assert_eq!(role.as_role().unwrap().id, Snowflake::new(21));

        let err = MemberType.match_token(&guild, "-7").unwrap_err();
        assert_eq!(err.0, "could not find member `-7`");
    }

    #[test]
    fn test_id_lookup_wins_over_name() {
        let guild = guild().with_channel(12u64, "10");
        let value = ChannelType.match_token(&guild, "10").unwrap();
        assert_eq!(value.as_channel().unwrap().id, Snowflake::new(10));
    }

    #[test]
    fn test_member_and_role() {
        let guild = guild();
        let member = MemberType.match_token(&guild, "<@!30>").unwrap();
        assert_eq!(member.as_member().unwrap().username, "alice");

        let role = RoleType.match_token(&guild, "<@&20>").unwrap();
        assert_eq!(role.as_role().unwrap().name, "mods");

        assert!(RoleType.match_token(&guild, "mods").is_err());
    }

    #[test]
    fn test_scalars() {
        let guild = guild();
        assert_eq!(
            IntegerType.match_token(&guild, "-12").unwrap().as_integer(),
            Some(-12)
        );
        assert!(IntegerType.match_token(&guild, "1.5").is_err());
        assert_eq!(
            NumberType.match_token(&guild, "1.5").unwrap().as_number(),
            Some(1.5)
        );
        assert!(NumberType.match_token(&guild, "inf").is_err());
        assert_eq!(
            BooleanType.match_token(&guild, "Yes").unwrap().as_bool(),
            Some(true)
        );
        assert_eq!(
            BooleanType.match_token(&guild, "off").unwrap().as_bool(),
            Some(false)
        );
        assert!(BooleanType.match_token(&guild, "maybe").is_err());
        assert_eq!(
            StringType.match_token(&guild, "anything").unwrap().as_str(),
            Some("anything")
        );
    }
}
