//! Command registry and best-match resolution.
//!
//! The registry is an append-mostly list of commands in registration order.
//! Readers take a cheap snapshot (`Arc<Vec<_>>`) so dispatch never holds the
//! lock while a handler runs; writers replace the snapshot.
//!
//! # Matching
//!
//! For tokens `t0 t1 … tn`, a command with group `[g0 … gk-1]` matches when
//! `t0..tk-1` equal the group and `tk` equals its name or one of its aliases.
//! Among all matches the one with the longest group wins; on a tie the
//! earliest registered wins.
//!
//! ```text
//! "mod user ban @x"   group ["mod","user"] / ban   ← wins (2)
//!                     group ["mod"]        / user     (1)
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::{debug, warn};

use sparkl_core::Snowflake;

use crate::command::Command;

/// Stable handle of a registered command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(u64);

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A command together with its registry handle.
#[derive(Debug, Clone)]
pub struct RegisteredCommand {
    pub id: CommandId,
    pub command: Arc<Command>,
}

/// Non-fatal problems detected while registering a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationWarning {
    /// Another command already has the same group and name.
    Duplicate {
        path: String,
        existing: CommandId,
        /// Guilds both commands are restricted to; empty if either is global or
        /// the scopes are disjoint.
        overlapping_guilds: Vec<Snowflake>,
    },
    /// Same group, different command, but a shared name or alias.
    AmbiguousInvocation {
        token: String,
        group: Vec<String>,
        existing: CommandId,
    },
    /// An alias also used by a command in another group.
    SharedAlias { alias: String, existing: CommandId },
}

impl fmt::Display for RegistrationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Duplicate {
                path,
                existing,
                overlapping_guilds,
            } => {
                write!(f, "command `{path}` is already registered as {existing}")?;
                if !overlapping_guilds.is_empty() {
                    let guilds: Vec<String> =
                        overlapping_guilds.iter().map(|g| g.to_string()).collect();
                    write!(f, " in guilds {}", guilds.join(", "))?;
                }
                Ok(())
            }
            Self::AmbiguousInvocation {
                token,
                group,
                existing,
            } => write!(
                f,
                "`{token}` in group `{}` already invokes {existing}",
                group.join(".")
            ),
            Self::SharedAlias { alias, existing } => {
                write!(f, "alias `{alias}` is also used by {existing}")
            }
        }
    }
}

/// Result of [`CommandRegistry::register`].
#[derive(Debug, Clone)]
pub struct Registration {
    pub id: CommandId,
    pub warnings: Vec<RegistrationWarning>,
}

impl Registration {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// The best command for a token sequence.
#[derive(Debug, Clone)]
pub struct CommandMatch {
    pub id: CommandId,
    pub command: Arc<Command>,
    /// The token that matched the name or alias.
    pub invoked_as: String,
    /// Tokens consumed: group length plus one.
    pub consumed: usize,
}

impl CommandMatch {
    pub fn group_len(&self) -> usize {
        self.consumed - 1
    }
}

/// Thread-safe command table.
#[derive(Debug)]
pub struct CommandRegistry {
    entries: RwLock<Arc<Vec<RegisteredCommand>>>,
    next_id: AtomicU64,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Arc::new(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Appends `command`.
    ///
    /// Collisions never reject the command; they are returned and logged as
    /// warnings, and the earlier registration keeps winning at match time.
    pub fn register(&self, command: Command) -> Registration {
        let id = CommandId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let command = Arc::new(command);

        let mut entries = self.entries.write();
        let warnings = collect_warnings(&entries, &command);
        for warning in &warnings {
            warn!(command = %command.path(), id = %id, "{warning}");
        }

        Arc::make_mut(&mut entries).push(RegisteredCommand {
            id,
            command: command.clone(),
        });
        debug!(
            command = %command.path(),
            id = %id,
            level = command.permission_level(),
            aliases = ?command.aliases(),
            "Command registered"
        );

        Registration { id, warnings }
    }

    /// Removes a command. Returns it if it was registered.
    pub fn remove(&self, id: CommandId) -> Option<Arc<Command>> {
        let mut entries = self.entries.write();
        let index = entries.iter().position(|e| e.id == id)?;
        let removed = Arc::make_mut(&mut entries).remove(index);
        debug!(command = %removed.command.path(), id = %id, "Command removed");
        Some(removed.command)
    }

    /// Removes every command tagged with plugin `name`. Returns how many.
    pub fn remove_plugin(&self, name: &str) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        Arc::make_mut(&mut entries).retain(|e| e.command.plugin() != Some(name));
        let removed = before - entries.len();
        debug!(plugin = name, removed, "Plugin commands removed");
        removed
    }

    pub fn get(&self, id: CommandId) -> Option<Arc<Command>> {
        self.snapshot()
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.command.clone())
    }

    /// The current command list in registration order.
    pub fn snapshot(&self) -> Arc<Vec<RegisteredCommand>> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Best match for `tokens` ignoring guild restrictions.
    pub fn find_best_match(&self, tokens: &[&str]) -> Option<CommandMatch> {
        self.find_best_match_for(None, tokens)
    }

    /// Best match for `tokens` among commands visible in `guild`.
    pub fn find_best_match_for(
        &self,
        guild: Option<Snowflake>,
        tokens: &[&str],
    ) -> Option<CommandMatch> {
        let entries = self.snapshot();
        let mut best: Option<(&RegisteredCommand, usize)> = None;

        for entry in entries.iter() {
            let command = &entry.command;
            let depth = command.group().len();
            if !command.guild_scope().includes(guild) || depth >= tokens.len() {
                continue;
            }
            let group_matches = command
                .group()
                .iter()
                .zip(tokens)
                .all(|(segment, token)| segment == token);
            if !group_matches || !command.answers_to(tokens[depth]) {
                continue;
            }
            if best.is_none_or(|(_, best_depth)| depth > best_depth) {
                best = Some((entry, depth));
            }
        }

        best.map(|(entry, depth)| CommandMatch {
            id: entry.id,
            command: entry.command.clone(),
            invoked_as: tokens[depth].to_string(),
            consumed: depth + 1,
        })
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_warnings(entries: &[RegisteredCommand], command: &Command) -> Vec<RegistrationWarning> {
    let mut warnings = Vec::new();
    let mut duplicate_reported = false;

    for entry in entries {
        let existing = &entry.command;
        let same_group = existing.group() == command.group();

        // Name+group collisions warn regardless of guild scope.
        if same_group && existing.name() == command.name() {
            if !duplicate_reported {
                warnings.push(RegistrationWarning::Duplicate {
                    path: command.path(),
                    existing: entry.id,
                    overlapping_guilds: existing.guild_scope().overlap(command.guild_scope()),
                });
                duplicate_reported = true;
            }
            continue;
        }

        if !existing.guild_scope().intersects(command.guild_scope()) {
            continue;
        }

        if same_group {
            for token in command.invocations().filter(|t| existing.answers_to(t)) {
                warnings.push(RegistrationWarning::AmbiguousInvocation {
                    token: token.to_string(),
                    group: command.group().to_vec(),
                    existing: entry.id,
                });
            }
        } else {
            for alias in command.aliases().iter().filter(|a| existing.has_alias(a)) {
                warnings.push(RegistrationWarning::SharedAlias {
                    alias: alias.clone(),
                    existing: entry.id,
                });
            }
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandOptions, HandlerResult};
    use crate::context::CommandContext;
    use crate::syntax::{Arguments, Syntax};

    async fn noop(_ctx: CommandContext, _args: Arguments) -> HandlerResult {
        Ok(())
    }

    fn cmd(path: &str) -> Command {
        Command::from_path(path, 0, Syntax::empty(), noop)
    }

    #[test]
    fn test_longest_group_wins() {
        let registry = CommandRegistry::new();
        registry.register(cmd("mod.user"));
        let deep = registry.register(cmd("mod.user.ban")).id;

        let found = registry
            .find_best_match(&["mod", "user", "ban", "<@1>"])
            .unwrap();
        assert_eq!(found.id, deep);
        assert_eq!(found.consumed, 3);
        assert_eq!(found.group_len(), 2);

        let shallow = registry.find_best_match(&["mod", "user", "kick"]).unwrap();
        assert_eq!(shallow.command.path(), "mod.user");
        assert_eq!(shallow.consumed, 2);
    }

    #[test]
    fn test_remove_plugin() {
        let registry = CommandRegistry::new();
        registry.register(cmd("ping"));
        registry.register(cmd("util.stats").with_plugin("utility"));
        registry.register(cmd("uptime").with_plugin("utility"));

        assert_eq!(registry.remove_plugin("utility"), 2);
        assert_eq!(registry.len(), 1);
        assert!(registry.find_best_match(&["uptime"]).is_none());
        assert_eq!(registry.remove_plugin("utility"), 0);
    }

    #[test]
    fn test_grouped_command_beats_ungrouped_name() {
        let registry = CommandRegistry::new();
        registry.register(cmd("a"));
        registry.register(cmd("a.b"));
        let deepest = registry.register(cmd("a.b.x")).id;

        let found = registry.find_best_match(&["a", "b", "x"]).unwrap();
        assert_eq!(found.id, deepest);
        assert_eq!(found.group_len(), 2);

        let middle = registry.find_best_match(&["a", "b", "y"]).unwrap();
        assert_eq!(middle.command.path(), "a.b");

        let top = registry.find_best_match(&["a", "c"]).unwrap();
        assert_eq!(top.command.path(), "a");
        assert_eq!(top.consumed, 1);
    }

    #[test]
    fn test_no_match() {
        let registry = CommandRegistry::new();
        registry.register(cmd("mod.ban"));
        assert!(registry.find_best_match(&["ban"]).is_none());
        assert!(registry.find_best_match(&["mod"]).is_none());
        assert!(registry.find_best_match(&[]).is_none());
    }

    #[test]
    fn test_alias_matches_like_name() {
        let registry = CommandRegistry::new();
        registry.register(cmd("ping").with_options(CommandOptions::new().alias("p")));

        let by_name = registry.find_best_match(&["ping"]).unwrap();
        let by_alias = registry.find_best_match(&["p", "extra"]).unwrap();
        assert_eq!(by_name.id, by_alias.id);
        assert_eq!(by_alias.invoked_as, "p");
        assert_eq!(by_alias.consumed, 1);
    }

    #[test]
    fn test_duplicate_warns_and_first_wins() {
        let registry = CommandRegistry::new();
        let first = registry.register(cmd("ping"));
        assert!(!first.has_warnings());

        let second = registry.register(cmd("ping"));
        assert_eq!(
            second.warnings,
            vec![RegistrationWarning::Duplicate {
                path: "ping".into(),
                existing: first.id,
                overlapping_guilds: Vec::new(),
            }]
        );
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.find_best_match(&["ping"]).unwrap().id, first.id);

        let third = registry.register(cmd("ping"));
        assert_eq!(third.warnings.len(), 1);
    }

    #[test]
    fn test_duplicate_reports_overlapping_guilds() {
        let a = Snowflake::new(1);
        let b = Snowflake::new(2);
        let registry = CommandRegistry::new();
        registry.register(cmd("ping").with_options(CommandOptions::new().guilds([a, b])));
        let second = registry.register(cmd("ping").with_options(CommandOptions::new().guild(b)));

        match &second.warnings[..] {
            [RegistrationWarning::Duplicate {
                overlapping_guilds, ..
            }] => assert_eq!(overlapping_guilds, &vec![b]),
            other => panic!("unexpected warnings: {other:?}"),
        }

        let disjoint = registry.register(cmd("ping").with_options(CommandOptions::new().guild(3u64)));
        match &disjoint.warnings[..] {
            [RegistrationWarning::Duplicate {
                overlapping_guilds, ..
            }] => assert!(overlapping_guilds.is_empty()),
            other => panic!("unexpected warnings: {other:?}"),
        }
    }

    #[test]
    fn test_alias_collision_warnings() {
        let registry = CommandRegistry::new();
        let ping = registry.register(cmd("ping").with_options(CommandOptions::new().alias("p")));
        let pong = registry.register(cmd("pong").with_options(CommandOptions::new().alias("p")));
        assert_eq!(
            pong.warnings,
            vec![RegistrationWarning::AmbiguousInvocation {
                token: "p".into(),
                group: Vec::new(),
                existing: ping.id,
            }]
        );

        let other = registry.register(cmd("mod.purge").with_options(CommandOptions::new().alias("p")));
        assert_eq!(other.warnings.len(), 2);
        assert!(
            other
                .warnings
                .iter()
                .all(|w| matches!(w, RegistrationWarning::SharedAlias { alias, .. } if alias == "p"))
        );
    }

    #[test]
    fn test_guild_filter() {
        let registry = CommandRegistry::new();
        registry.register(cmd("secret").with_options(CommandOptions::new().guild(1u64)));

        assert!(
            registry
                .find_best_match_for(Some(Snowflake::new(1)), &["secret"])
                .is_some()
        );
        assert!(
            registry
                .find_best_match_for(Some(Snowflake::new(2)), &["secret"])
                .is_none()
        );
        assert!(registry.find_best_match(&["secret"]).is_some());
    }

    #[test]
    fn test_remove() {
        let registry = CommandRegistry::new();
        let id = registry.register(cmd("ping")).id;
        let snapshot = registry.snapshot();

        assert!(registry.remove(id).is_some());
        assert!(registry.remove(id).is_none());
        assert!(registry.is_empty());
        assert!(registry.get(id).is_none());
        // earlier snapshots are unaffected
        assert_eq!(snapshot.len(), 1);
    }
}
