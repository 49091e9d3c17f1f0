//! Foundation layer - identifiers, messages and guild lookups.
//!
//! Everything in this module is plain data; nothing here performs I/O.

pub mod error;
pub mod guild;
pub mod id;
pub mod message;

pub use error::{ProviderError, ProviderResult, TransportError, TransportResult};
pub use guild::{Channel, GuildLookup, GuildSnapshot, Member, Role};
pub use id::{Snowflake, SnowflakeParseError};
pub use message::{Author, InboundMessage};
