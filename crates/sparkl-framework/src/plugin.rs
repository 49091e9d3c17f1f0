//! Plugins: named bundles of commands and message listeners.
//!
//! A plugin registers everything it owns through a [`PluginScope`] while it is
//! attached. The [`PluginRegistry`] remembers what each plugin registered, so
//! detaching it removes exactly those commands and listeners.
//!
//! # Example
//!
//! ```rust,ignore
//! #[derive(serde::Deserialize, Default)]
//! #[serde(default)]
//! struct GreeterConfig { greeting: String }
//!
//! let greeter = FnPlugin::new("greeter", |scope| {
//!     let config: GreeterConfig = scope.get_config()?;
//!     scope.command(Command::new("hello", 0, Syntax::empty(), hello));
//!     Ok(())
//! });
//!
//! plugins.attach(Arc::new(greeter), Arc::new(json!({ "greeting": "hi" })))?;
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tower::BoxError;
use tracing::{info, warn};

use crate::command::Command;
use crate::error::PluginError;
use crate::listener::{ListenerId, ListenerSet, MessageListener};
use crate::registry::{CommandId, CommandRegistry, RegistrationWarning};

// ─── Plugin ───────────────────────────────────────────────────────────────────

/// A named unit of functionality.
pub trait Plugin: Send + Sync + 'static {
    /// Unique plugin name; also the key of its config section.
    fn name(&self) -> &str;

    /// Registers the plugin's commands and listeners.
    fn attach(&self, scope: &mut PluginScope<'_>) -> Result<(), BoxError>;

    /// Called after the plugin's commands and listeners were removed.
    fn detach(&self) {}
}

/// A plugin built from a name and a start function.
pub struct FnPlugin<F> {
    name: String,
    start: F,
}

impl<F> FnPlugin<F>
where
    F: Fn(&mut PluginScope<'_>) -> Result<(), BoxError> + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, start: F) -> Self {
        Self {
            name: name.into(),
            start,
        }
    }
}

impl<F> Plugin for FnPlugin<F>
where
    F: Fn(&mut PluginScope<'_>) -> Result<(), BoxError> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn attach(&self, scope: &mut PluginScope<'_>) -> Result<(), BoxError> {
        (self.start)(scope)
    }
}

// ─── PluginScope ──────────────────────────────────────────────────────────────

/// Registration handle passed to [`Plugin::attach`].
pub struct PluginScope<'a> {
    name: &'a str,
    config: Arc<serde_json::Value>,
    registry: &'a CommandRegistry,
    listeners: &'a ListenerSet,
    commands: Vec<CommandId>,
    listener_ids: Vec<ListenerId>,
    warnings: Vec<RegistrationWarning>,
}

impl<'a> PluginScope<'a> {
    fn new(
        name: &'a str,
        config: Arc<serde_json::Value>,
        registry: &'a CommandRegistry,
        listeners: &'a ListenerSet,
    ) -> Self {
        Self {
            name,
            config,
            registry,
            listeners,
            commands: Vec::new(),
            listener_ids: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    /// Raw config section; `null` when the plugin has none.
    pub fn config(&self) -> &serde_json::Value {
        &self.config
    }

    /// Deserializes the config section. A missing section reads as `{}`.
    pub fn get_config<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        match self.config.as_ref() {
            serde_json::Value::Null => T::deserialize(&serde_json::json!({})),
            value => T::deserialize(value),
        }
    }

    /// Registers a command owned by this plugin.
    pub fn command(&mut self, command: Command) -> CommandId {
        let registration = self.registry.register(command.with_plugin(self.name));
        self.commands.push(registration.id);
        self.warnings.extend(registration.warnings);
        registration.id
    }

    /// Registers a message listener owned by this plugin.
    pub fn on_message(&mut self, listener: impl MessageListener) -> ListenerId {
        let id = self.listeners.add(listener, Some(self.name));
        self.listener_ids.push(id);
        id
    }

    fn rollback(&self) {
        for id in &self.commands {
            self.registry.remove(*id);
        }
        for id in &self.listener_ids {
            self.listeners.remove(*id);
        }
    }
}

// ─── PluginRegistry ───────────────────────────────────────────────────────────

/// What a plugin registered while attaching.
#[derive(Debug, Clone, Default)]
pub struct PluginReport {
    pub commands: Vec<CommandId>,
    pub listeners: Vec<ListenerId>,
    pub warnings: Vec<RegistrationWarning>,
}

struct AttachedPlugin {
    plugin: Arc<dyn Plugin>,
    report: PluginReport,
}

/// Tracks attached plugins and the registrations they own.
pub struct PluginRegistry {
    commands: Arc<CommandRegistry>,
    listeners: Arc<ListenerSet>,
    attached: Mutex<Vec<AttachedPlugin>>,
}

impl PluginRegistry {
    pub fn new(commands: Arc<CommandRegistry>, listeners: Arc<ListenerSet>) -> Self {
        Self {
            commands,
            listeners,
            attached: Mutex::new(Vec::new()),
        }
    }

    /// Attaches `plugin` with its config section.
    ///
    /// If the attach hook fails, everything it registered so far is removed.
    pub fn attach(
        &self,
        plugin: Arc<dyn Plugin>,
        config: Arc<serde_json::Value>,
    ) -> Result<PluginReport, PluginError> {
        let mut attached = self.attached.lock();
        let name = plugin.name().to_string();
        if attached.iter().any(|p| p.plugin.name() == name) {
            return Err(PluginError::AlreadyAttached(name));
        }

        let mut scope = PluginScope::new(&name, config, &self.commands, &self.listeners);
        if let Err(e) = plugin.attach(&mut scope) {
            scope.rollback();
            warn!(plugin = %name, "Plugin failed to attach: {e}");
            return Err(PluginError::AttachFailed {
                name,
                reason: e.to_string(),
            });
        }

        let report = PluginReport {
            commands: scope.commands,
            listeners: scope.listener_ids,
            warnings: scope.warnings,
        };
        info!(
            plugin = %name,
            commands = report.commands.len(),
            listeners = report.listeners.len(),
            "Plugin attached"
        );
        attached.push(AttachedPlugin {
            plugin,
            report: report.clone(),
        });
        Ok(report)
    }

    /// Detaches the plugin named `name`, removing its commands and listeners.
    pub fn detach(&self, name: &str) -> Result<(), PluginError> {
        let entry = {
            let mut attached = self.attached.lock();
            let index = attached
                .iter()
                .position(|p| p.plugin.name() == name)
                .ok_or_else(|| PluginError::NotAttached(name.to_string()))?;
            attached.remove(index)
        };

        for id in &entry.report.commands {
            self.commands.remove(*id);
        }
        for id in &entry.report.listeners {
            self.listeners.remove(*id);
        }
        entry.plugin.detach();
        info!(plugin = %name, "Plugin detached");
        Ok(())
    }

    /// Names of attached plugins in attach order.
    pub fn names(&self) -> Vec<String> {
        self.attached
            .lock()
            .iter()
            .map(|p| p.plugin.name().to_string())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attached.lock().iter().any(|p| p.plugin.name() == name)
    }

    pub fn len(&self) -> usize {
        self.attached.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.attached.lock().is_empty()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.names())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use serde::Deserialize;
    use sparkl_core::InboundMessage;

    use super::*;
    use crate::command::HandlerResult;
    use crate::context::CommandContext;
    use crate::syntax::{Arguments, Syntax};

    async fn noop(_ctx: CommandContext, _args: Arguments) -> HandlerResult {
        Ok(())
    }

    async fn listen(_message: Arc<InboundMessage>) -> Result<(), BoxError> {
        Ok(())
    }

    fn registries() -> (Arc<CommandRegistry>, Arc<ListenerSet>, PluginRegistry) {
        let commands = Arc::new(CommandRegistry::new());
        let listeners = Arc::new(ListenerSet::new());
        let plugins = PluginRegistry::new(commands.clone(), listeners.clone());
        (commands, listeners, plugins)
    }

    fn utility() -> Arc<dyn Plugin> {
        Arc::new(FnPlugin::new("utility", |scope| {
            scope.command(Command::new("ping", 0, Syntax::empty(), noop));
            scope.command(Command::from_path("util.stats", 0, Syntax::empty(), noop));
            scope.on_message(listen);
            Ok(())
        }))
    }

    #[test]
    fn test_attach_tags_and_detach_removes() {
        let (commands, listeners, plugins) = registries();
        commands.register(Command::new("help", 0, Syntax::empty(), noop));

        let report = plugins
            .attach(utility(), Arc::new(serde_json::Value::Null))
            .unwrap();
        assert_eq!(report.commands.len(), 2);
        assert_eq!(listeners.len(), 1);
        assert_eq!(commands.len(), 3);
        assert_eq!(
            commands.find_best_match(&["ping"]).unwrap().command.plugin(),
            Some("utility")
        );
        assert_eq!(plugins.names(), ["utility"]);

        plugins.detach("utility").unwrap();
        assert_eq!(commands.len(), 1);
        assert!(listeners.is_empty());
        assert!(commands.find_best_match(&["help"]).is_some());
        assert!(!plugins.contains("utility"));
    }

    #[test]
    fn test_double_attach_and_unknown_detach() {
        let (_commands, _listeners, plugins) = registries();
        plugins
            .attach(utility(), Arc::new(serde_json::Value::Null))
            .unwrap();

        assert_eq!(
            plugins
                .attach(utility(), Arc::new(serde_json::Value::Null))
                .unwrap_err(),
            PluginError::AlreadyAttached("utility".into())
        );
        assert_eq!(
            plugins.detach("nope"),
            Err(PluginError::NotAttached("nope".into()))
        );
    }

    #[test]
    fn test_failed_attach_rolls_back() {
        let (commands, _listeners, plugins) = registries();
        let broken = FnPlugin::new("broken", |scope| {
            scope.command(Command::new("half", 0, Syntax::empty(), noop));
            Err("missing token".into())
        });

        let err = plugins
            .attach(Arc::new(broken), Arc::new(serde_json::Value::Null))
            .unwrap_err();
        assert!(matches!(err, PluginError::AttachFailed { .. }));
        assert!(commands.is_empty());
        assert!(plugins.is_empty());
    }

    #[test]
    fn test_config_section() {
        #[derive(Deserialize, Default)]
        #[serde(default)]
        struct Greeter {
            greeting: String,
        }

        let seen = Arc::new(Mutex::new(String::new()));
        let sink = seen.clone();
        let (_commands, _listeners, plugins) = registries();
        let greeter = FnPlugin::new("greeter", move |scope| {
            let config: Greeter = scope.get_config()?;
            *sink.lock() = config.greeting;
            Ok(())
        });

        plugins
            .attach(
                Arc::new(greeter),
                Arc::new(serde_json::json!({ "greeting": "hello" })),
            )
            .unwrap();
        assert_eq!(*seen.lock(), "hello");
    }

    #[test]
    fn test_detach_hook_runs() {
        struct Tracked(Arc<AtomicBool>);

        impl Plugin for Tracked {
            fn name(&self) -> &str {
                "tracked"
            }

            fn attach(&self, _scope: &mut PluginScope<'_>) -> Result<(), BoxError> {
                Ok(())
            }

            fn detach(&self) {
                self.0.store(true, Ordering::SeqCst);
            }
        }

        let flag = Arc::new(AtomicBool::new(false));
        let (_commands, _listeners, plugins) = registries();
        plugins
            .attach(
                Arc::new(Tracked(flag.clone())),
                Arc::new(serde_json::Value::Null),
            )
            .unwrap();
        plugins.detach("tracked").unwrap();
        assert!(flag.load(Ordering::SeqCst));
    }
}
