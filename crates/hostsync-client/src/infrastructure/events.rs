//! Event-listener registry.
//!
//! UI components remount constantly, and every remount tries to register the
//! same handlers again.  Left unchecked that either stacks duplicate
//! subscriptions (every hosts-file change triggers N reloads) or leaks
//! subscriptions that outlive their owner.  The registry prevents both:
//!
//! - **Local subscriptions** are keyed by (target, event, handler label);
//!   registering an existing key is a no-op.  The label plays the role a
//!   handler's function name plays in dynamic UIs — two registrations with
//!   the same label are declared to be the same handler.
//! - **Push subscriptions** wire the underlying backend subscription at most
//!   once per event name and multiplex any number of labeled handlers over
//!   it, so a second subscriber neither double-subscribes nor silently
//!   vanishes.
//! - **Scopes** ([`ListenerScope`]) record what they registered and
//!   unregister exactly that when dropped, giving components automatic
//!   teardown without bookkeeping.
//!
//! The registry is explicitly constructed and owned — typically one per
//! application, created and torn down at the composition root.  Cloning is
//! cheap and shares the same underlying state.
//!
//! Bookkeeping uses `std::sync::Mutex` with short critical sections and no
//! awaits while locked; handlers are invoked after the lock is released, so
//! a handler may re-enter the registry freely.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::debug;

use crate::application::bridge::{BackendBridge, PushCallback};

/// Handler for a local (in-process) event.
pub type LocalHandler = Arc<dyn Fn(&Value) + Send + Sync>;

type LocalKey = (String, String, String);

struct RegistryInner {
    bridge: Arc<dyn BackendBridge>,
    /// (target, event, label) → handler.
    local: Mutex<HashMap<LocalKey, LocalHandler>>,
    /// event → label → handler.  Presence of the event key implies the
    /// bridge subscription is wired.
    push: Mutex<HashMap<String, HashMap<String, PushCallback>>>,
}

/// Deduplicating subscription tracker for local and backend-push events.
#[derive(Clone)]
pub struct ListenerRegistry {
    inner: Arc<RegistryInner>,
}

impl ListenerRegistry {
    pub fn new(bridge: Arc<dyn BackendBridge>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                bridge,
                local: Mutex::new(HashMap::new()),
                push: Mutex::new(HashMap::new()),
            }),
        }
    }

    // ── Local subscriptions ──────────────────────────────────────────────────

    /// Registers a local handler.  Returns `false` (and changes nothing) if
    /// the (target, event, label) key is already registered.
    pub fn register_local(
        &self,
        target: &str,
        event: &str,
        label: &str,
        handler: LocalHandler,
    ) -> bool {
        let key = (target.to_string(), event.to_string(), label.to_string());
        let mut local = self.inner.local.lock().unwrap();
        if local.contains_key(&key) {
            debug!(target, event, label, "local listener already registered");
            return false;
        }
        local.insert(key, handler);
        true
    }

    /// Removes a local handler if present; no-op otherwise.
    pub fn unregister_local(&self, target: &str, event: &str, label: &str) {
        let key = (target.to_string(), event.to_string(), label.to_string());
        self.inner.local.lock().unwrap().remove(&key);
    }

    /// Invokes every handler registered for (target, event).
    ///
    /// Handlers run after the registry lock is released; a handler that
    /// (un)registers listeners will not deadlock.
    pub fn dispatch_local(&self, target: &str, event: &str, payload: &Value) {
        let handlers: Vec<LocalHandler> = {
            let local = self.inner.local.lock().unwrap();
            local
                .iter()
                .filter(|(key, _)| key.0 == target && key.1 == event)
                .map(|(_, handler)| Arc::clone(handler))
                .collect()
        };
        for handler in handlers {
            handler(payload);
        }
    }

    // ── Push subscriptions ───────────────────────────────────────────────────

    /// Registers a handler for a backend push event.
    ///
    /// The underlying bridge subscription is created only for the first
    /// handler of an event name; further handlers share it.  Registering the
    /// same (event, label) twice is a no-op and returns `false`.
    pub fn register_push(&self, event: &str, label: &str, handler: PushCallback) -> bool {
        let needs_wire = {
            let mut push = self.inner.push.lock().unwrap();
            let handlers = push.entry(event.to_string()).or_default();
            if handlers.contains_key(label) {
                debug!(event, label, "push listener already registered");
                return false;
            }
            let first_for_event = handlers.is_empty();
            handlers.insert(label.to_string(), handler);
            first_for_event
        };

        if needs_wire {
            let inner = Arc::clone(&self.inner);
            let event_name = event.to_string();
            self.inner.bridge.subscribe_push(
                event,
                Arc::new(move |payload| {
                    // Snapshot the handler list, then fan out unlocked.
                    let handlers: Vec<PushCallback> = {
                        let push = inner.push.lock().unwrap();
                        push.get(&event_name)
                            .map(|m| m.values().cloned().collect())
                            .unwrap_or_default()
                    };
                    for handler in handlers {
                        handler(payload);
                    }
                }),
            );
        }
        true
    }

    /// Removes one labeled handler.  The bridge subscription is torn down
    /// when the last handler for the event goes away.
    pub fn unregister_push_handler(&self, event: &str, label: &str) {
        let unwire = {
            let mut push = self.inner.push.lock().unwrap();
            match push.get_mut(event) {
                Some(handlers) => {
                    handlers.remove(label);
                    if handlers.is_empty() {
                        push.remove(event);
                        true
                    } else {
                        false
                    }
                }
                None => false,
            }
        };
        if unwire {
            self.inner.bridge.unsubscribe_push(event);
        }
    }

    /// Removes every handler for the named push event and tears down the
    /// bridge subscription; no-op if nothing is registered.
    pub fn unregister_push(&self, event: &str) {
        let was_registered = self.inner.push.lock().unwrap().remove(event).is_some();
        if was_registered {
            self.inner.bridge.unsubscribe_push(event);
        }
    }

    // ── Teardown ─────────────────────────────────────────────────────────────

    /// Removes every tracked subscription of both kinds.  Safe to call any
    /// number of times.
    pub fn cleanup_all(&self) {
        self.inner.local.lock().unwrap().clear();

        let events: Vec<String> = {
            let mut push = self.inner.push.lock().unwrap();
            push.drain().map(|(event, _)| event).collect()
        };
        for event in events {
            self.inner.bridge.unsubscribe_push(&event);
        }
    }

    /// Current (local, push-event) subscription counts, for diagnostics.
    pub fn listener_counts(&self) -> (usize, usize) {
        (
            self.inner.local.lock().unwrap().len(),
            self.inner.push.lock().unwrap().len(),
        )
    }

    /// Opens a scope whose registrations are automatically unregistered when
    /// the returned guard drops.
    pub fn scope(&self) -> ListenerScope {
        ListenerScope {
            registry: self.clone(),
            local_keys: Vec::new(),
            push_keys: Vec::new(),
        }
    }
}

/// RAII guard binding registrations to an owning scope's lifetime.
///
/// Components register through the scope instead of the registry; dropping
/// the scope unregisters exactly what the scope registered, leaving other
/// scopes' subscriptions alone.
pub struct ListenerScope {
    registry: ListenerRegistry,
    local_keys: Vec<LocalKey>,
    push_keys: Vec<(String, String)>,
}

impl ListenerScope {
    /// Scope-tracked [`ListenerRegistry::register_local`].
    pub fn register_local(
        &mut self,
        target: &str,
        event: &str,
        label: &str,
        handler: LocalHandler,
    ) {
        if self.registry.register_local(target, event, label, handler) {
            self.local_keys
                .push((target.to_string(), event.to_string(), label.to_string()));
        }
    }

    /// Scope-tracked [`ListenerRegistry::register_push`].
    pub fn register_push(&mut self, event: &str, label: &str, handler: PushCallback) {
        if self.registry.register_push(event, label, handler) {
            self.push_keys.push((event.to_string(), label.to_string()));
        }
    }
}

impl Drop for ListenerScope {
    fn drop(&mut self) {
        for (target, event, label) in self.local_keys.drain(..) {
            self.registry.unregister_local(&target, &event, &label);
        }
        for (event, label) in self.push_keys.drain(..) {
            self.registry.unregister_push_handler(&event, &label);
        }
    }
}
