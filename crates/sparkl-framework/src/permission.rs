//! Permission level resolution.
//!
//! Levels are plain integers; higher means more privileged.
//!
//! - **Required level**: the guild's override for the command name if one
//!   exists, else the command's declared level. An override *replaces* the
//!   declared level; it can lower it as well as raise it.
//! - **Effective level**: the maximum of the user's own level and the levels
//!   of every role they hold, defaulting to 0. Levels never add up.
//!
//! The invoker is authorized iff `effective >= required`.

use sparkl_core::{InboundMessage, PermissionConfig, Snowflake};
use tracing::trace;

use crate::command::Command;
use crate::error::PermissionError;

/// The identity being checked.
#[derive(Debug, Clone, Copy)]
pub struct Invoker<'a> {
    pub user: Snowflake,
    pub roles: &'a [Snowflake],
}

impl<'a> Invoker<'a> {
    pub fn new(user: Snowflake, roles: &'a [Snowflake]) -> Self {
        Self { user, roles }
    }
}

impl<'a> From<&'a InboundMessage> for Invoker<'a> {
    fn from(message: &'a InboundMessage) -> Self {
        Self {
            user: message.author.id,
            roles: &message.member_roles,
        }
    }
}

/// Levels of a successful check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authorized {
    pub required: u32,
    pub effective: u32,
}

/// Level required to run `command` under `config`.
pub fn required_level(command: &Command, config: &PermissionConfig) -> u32 {
    config
        .command_permission_overrides
        .get(command.name())
        .copied()
        .unwrap_or_else(|| command.permission_level())
}

/// Highest level granted to `invoker` by its user entry or any held role.
pub fn effective_level(invoker: Invoker<'_>, config: &PermissionConfig) -> u32 {
    let user = config.users.get(&invoker.user).copied();
    let roles = invoker
        .roles
        .iter()
        .filter_map(|role| config.roles.get(role).copied());

    user.into_iter().chain(roles).max().unwrap_or(0)
}

/// Checks whether `invoker` may run `command`.
pub fn resolve(
    command: &Command,
    invoker: Invoker<'_>,
    config: &PermissionConfig,
) -> Result<Authorized, PermissionError> {
    let required = required_level(command, config);
    let effective = effective_level(invoker, config);
    trace!(
        command = %command.path(),
        user = %invoker.user,
        required,
        effective,
        "Permission resolved"
    );

    if effective >= required {
        Ok(Authorized {
            required,
            effective,
        })
    } else {
        Err(PermissionError {
            required,
            received: effective,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::HandlerResult;
    use crate::context::CommandContext;
    use crate::syntax::{Arguments, Syntax};

    async fn noop(_ctx: CommandContext, _args: Arguments) -> HandlerResult {
        Ok(())
    }

    fn ban() -> Command {
        Command::from_path("mod.ban", 5, Syntax::empty(), noop)
    }

    const USER: Snowflake = Snowflake::new(100);
    const HELPER: Snowflake = Snowflake::new(200);
    const ADMIN: Snowflake = Snowflake::new(201);

    #[test]
    fn test_override_replaces_declared_level() {
        let config = PermissionConfig::default()
            .with_override("ban", 1)
            .with_user(USER, 1);
        let result = resolve(&ban(), Invoker::new(USER, &[]), &config).unwrap();
        assert_eq!(
            result,
            Authorized {
                required: 1,
                effective: 1
            }
        );
    }

    #[test]
    fn test_override_can_raise_level() {
        let config = PermissionConfig::default()
            .with_override("ban", 9)
            .with_user(USER, 7);
        assert_eq!(
            resolve(&ban(), Invoker::new(USER, &[]), &config),
            Err(PermissionError {
                required: 9,
                received: 7
            })
        );
    }

    #[test]
    fn test_role_levels_take_maximum() {
        let config = PermissionConfig::default()
            .with_role(HELPER, 2)
            .with_role(ADMIN, 7);
        let roles = [HELPER, ADMIN];
        assert_eq!(effective_level(Invoker::new(USER, &roles), &config), 7);
    }

    #[test]
    fn test_user_level_competes_with_roles() {
        let config = PermissionConfig::default()
            .with_user(USER, 6)
            .with_role(HELPER, 2);
        assert_eq!(effective_level(Invoker::new(USER, &[HELPER]), &config), 6);
    }

    #[test]
    fn test_unknown_invoker_is_level_zero() {
        let config = PermissionConfig::default();
        let invoker = Invoker::new(USER, &[HELPER]);
        assert_eq!(effective_level(invoker, &config), 0);
        assert_eq!(
            resolve(&ban(), invoker, &config),
            Err(PermissionError {
                required: 5,
                received: 0
            })
        );

        let free = Command::new("ping", 0, Syntax::empty(), noop);
        assert!(resolve(&free, invoker, &config).is_ok());
    }

    #[test]
    fn test_invoker_from_message() {
        use sparkl_core::{Author, InboundMessage};

        let message = InboundMessage::new(1u64, 2u64, Author::new(USER, "u"), "!x")
            .with_roles([ADMIN]);
        let config = PermissionConfig::default().with_role(ADMIN, 5);
        assert!(resolve(&ban(), Invoker::from(&message), &config).is_ok());
    }
}
