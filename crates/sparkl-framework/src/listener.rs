//! Message listeners: callbacks that see every inbound message.
//!
//! Listeners run before command dispatch, in registration order. A listener
//! error or panic is logged and does not stop the remaining listeners or the
//! dispatch.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use tower::BoxError;
use tracing::{debug, error, warn};

use sparkl_core::InboundMessage;

use crate::dispatcher::panic_message;

/// Stable handle of a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// An async callback invoked for every inbound message.
pub trait MessageListener: Send + Sync + 'static {
    fn on_message(&self, message: Arc<InboundMessage>) -> BoxFuture<'static, Result<(), BoxError>>;
}

impl<F, Fut> MessageListener for F
where
    F: Fn(Arc<InboundMessage>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    fn on_message(&self, message: Arc<InboundMessage>) -> BoxFuture<'static, Result<(), BoxError>> {
        Box::pin(self(message))
    }
}

#[derive(Clone)]
struct ListenerEntry {
    id: ListenerId,
    plugin: Option<String>,
    listener: Arc<dyn MessageListener>,
}

/// Ordered, copy-on-write set of listeners.
pub struct ListenerSet {
    entries: RwLock<Arc<Vec<ListenerEntry>>>,
    next_id: AtomicU64,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Arc::new(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Adds a listener, optionally tagged with its owning plugin.
    pub fn add(&self, listener: impl MessageListener, plugin: Option<&str>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut entries = self.entries.write();
        Arc::make_mut(&mut entries).push(ListenerEntry {
            id,
            plugin: plugin.map(str::to_string),
            listener: Arc::new(listener),
        });
        debug!(listener = id.0, plugin = ?plugin, "Message listener added");
        id
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.write();
        let Some(index) = entries.iter().position(|e| e.id == id) else {
            return false;
        };
        Arc::make_mut(&mut entries).remove(index);
        true
    }

    /// Runs every listener on `message`, one after another.
    pub async fn notify(&self, message: Arc<InboundMessage>) {
        let entries = self.entries.read().clone();
        for entry in entries.iter() {
            let plugin = entry.plugin.as_deref().unwrap_or("-");
            let result = AssertUnwindSafe(entry.listener.on_message(message.clone()))
                .catch_unwind()
                .await;
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(listener = entry.id.0, plugin, "Message listener failed: {e}");
                }
                Err(panic) => {
                    let reason = panic_message(panic.as_ref());
                    error!(listener = entry.id.0, plugin, "Message listener panicked: {reason}");
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for ListenerSet {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use sparkl_core::Author;

    fn message(content: &str) -> Arc<InboundMessage> {
        Arc::new(InboundMessage::new(1u64, 2u64, Author::new(3u64, "u"), content))
    }

    #[tokio::test]
    async fn test_listeners_run_in_order_and_survive_errors() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let set = ListenerSet::new();

        let log = seen.clone();
        set.add(
            move |m: Arc<InboundMessage>| {
                let log = log.clone();
                async move {
                    log.lock().push(format!("first:{}", m.content));
                    Err::<(), BoxError>("nope".into())
                }
            },
            None,
        );
        let log = seen.clone();
        set.add(
            move |m: Arc<InboundMessage>| {
                let log = log.clone();
                async move {
                    log.lock().push(format!("second:{}", m.content));
                    Ok::<(), BoxError>(())
                }
            },
            Some("greeter"),
        );

        set.notify(message("hi")).await;
        assert_eq!(*seen.lock(), ["first:hi", "second:hi"]);
    }

    #[tokio::test]
    async fn test_panicking_listener_is_contained() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let set = ListenerSet::new();

        set.add(
            |_m: Arc<InboundMessage>| async move {
                if true {
                    panic!("listener exploded");
                }
                Ok::<(), BoxError>(())
            },
            Some("broken"),
        );
        let log = seen.clone();
        set.add(
            move |m: Arc<InboundMessage>| {
                let log = log.clone();
                async move {
                    log.lock().push(m.content.clone());
                    Ok::<(), BoxError>(())
                }
            },
            None,
        );

        set.notify(message("still here")).await;
        assert_eq!(*seen.lock(), ["still here"]);
    }

    #[tokio::test]
    async fn test_remove() {
        let set = ListenerSet::new();
        let id = set.add(|_m: Arc<InboundMessage>| async { Ok::<(), BoxError>(()) }, None);
        assert_eq!(set.len(), 1);
        assert!(set.remove(id));
        assert!(!set.remove(id));
        assert!(set.is_empty());
        set.notify(message("ignored")).await;
    }
}
