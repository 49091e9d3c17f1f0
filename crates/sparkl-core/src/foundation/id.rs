//! Opaque numeric identifiers.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// A platform identifier for a user, guild, channel or role.
///
/// Serialized as a decimal string; deserializes from either a string or an
/// unsigned integer, so it can be used as a map key in TOML/YAML/JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Snowflake(u64);

impl Snowflake {
    /// Wraps a raw id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for Snowflake {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Returned when a string is not a decimal id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{0}` is not a valid id")]
pub struct SnowflakeParseError(pub String);

impl FromStr for Snowflake {
    type Err = SnowflakeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| SnowflakeParseError(s.to_string()))
    }
}

impl Serialize for Snowflake {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Snowflake {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SnowflakeVisitor;

        impl Visitor<'_> for SnowflakeVisitor {
            type Value = Snowflake;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a decimal id as a string or unsigned integer")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Snowflake, E> {
                Ok(Snowflake(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Snowflake, E> {
                u64::try_from(v)
                    .map(Snowflake)
                    .map_err(|_| E::custom(format!("negative id: {v}")))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Snowflake, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(SnowflakeVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let id: Snowflake = "80351110224678912".parse().unwrap();
        assert_eq!(id.get(), 80351110224678912);
        assert_eq!(id.to_string(), "80351110224678912");
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        assert!("general".parse::<Snowflake>().is_err());
        assert!("-5".parse::<Snowflake>().is_err());
    }

    #[test]
    fn test_serde_accepts_string_and_integer() {
        let from_str: Snowflake = serde_json::from_str("\"42\"").unwrap();
        let from_int: Snowflake = serde_json::from_str("42").unwrap();
        assert_eq!(from_str, from_int);
        assert_eq!(serde_json::to_string(&from_int).unwrap(), "\"42\"");
    }

    #[test]
    fn test_serde_as_map_key() {
        let map: std::collections::HashMap<Snowflake, u32> =
            serde_json::from_str(r#"{"7": 3}"#).unwrap();
        assert_eq!(map.get(&Snowflake::new(7)), Some(&3));
    }
}
