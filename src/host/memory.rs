//! In-memory reference host.
//!
//! A [`MemoryHub`] owns the two scope maps. Any number of [`MemoryContext`]s
//! can join it, each standing in for one execution context (one "page") with
//! its own area handles and its own hook table. A mutation performed through
//! one context's area updates the shared map and synchronously invokes the
//! hooks of every *other* live context — never the mutating context's own,
//! matching the platform contract.
//!
//! Primarily for tests and native embedders; all data is lost on drop.

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use super::{Host, HookId, NotificationHook, NotificationSource, RawNotification, StorageArea};
use crate::types::Scope;

/// Shared hub joined by any number of contexts.
#[derive(Clone, Default)]
pub struct MemoryHub {
    shared: Arc<HubShared>,
}

#[derive(Default)]
struct HubShared {
    inner: RwLock<HubInner>,
}

#[derive(Default)]
struct HubInner {
    durable: HashMap<String, String>,
    session: HashMap<String, String>,
    contexts: Vec<ContextEntry>,
    next_context: u64,
}

struct ContextEntry {
    id: u64,
    url: String,
    hooks: Weak<HookTable>,
    durable_area: Weak<MemoryArea>,
    session_area: Weak<MemoryArea>,
}

impl HubInner {
    fn map(&self, scope: Scope) -> &HashMap<String, String> {
        match scope {
            Scope::Durable => &self.durable,
            Scope::Session => &self.session,
        }
    }

    fn map_mut(&mut self, scope: Scope) -> &mut HashMap<String, String> {
        match scope {
            Scope::Durable => &mut self.durable,
            Scope::Session => &mut self.session,
        }
    }

    /// Collect deliveries for every live context except the mutating one,
    /// pruning entries whose context is gone.
    fn fanout(&mut self, origin: u64, scope: Scope) -> Vec<Delivery> {
        let origin_url = self
            .contexts
            .iter()
            .find(|c| c.id == origin)
            .map(|c| c.url.clone());

        let mut deliveries = Vec::new();
        self.contexts.retain(|entry| {
            let Some(hooks) = entry.hooks.upgrade() else {
                return false;
            };
            if entry.id != origin {
                let area = match scope {
                    Scope::Durable => entry.durable_area.upgrade(),
                    Scope::Session => entry.session_area.upgrade(),
                };
                deliveries.push(Delivery {
                    hooks: hooks.snapshot(),
                    area: area.map(|a| a as Arc<dyn StorageArea>),
                    url: origin_url.clone(),
                });
            }
            true
        });
        deliveries
    }
}

/// Hooks and target area for one receiving context.
struct Delivery {
    hooks: Vec<Arc<NotificationHook>>,
    area: Option<Arc<dyn StorageArea>>,
    url: Option<String>,
}

impl Delivery {
    fn dispatch(
        &self,
        key: Option<&str>,
        old_value: Option<&str>,
        new_value: Option<&str>,
    ) {
        for hook in &self.hooks {
            hook(RawNotification {
                key: key.map(str::to_owned),
                old_value: old_value.map(str::to_owned),
                new_value: new_value.map(str::to_owned),
                area: self.area.clone(),
                url: self.url.clone(),
            });
        }
    }
}

impl MemoryHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Join as a new context with a synthetic document URL.
    pub fn context(&self) -> MemoryContext {
        self.join(None)
    }

    /// Join as a new context located at the given document URL.
    pub fn context_at(&self, url: impl Into<String>) -> MemoryContext {
        self.join(Some(url.into()))
    }

    fn join(&self, url: Option<String>) -> MemoryContext {
        let hooks = Arc::new(HookTable::default());
        let mut inner = self.shared.inner.write();
        let id = inner.next_context;
        inner.next_context += 1;
        let url = url.unwrap_or_else(|| format!("memory://context/{id}"));

        let durable = Arc::new(MemoryArea {
            hub: Arc::clone(&self.shared),
            scope: Scope::Durable,
            context: id,
        });
        let session = Arc::new(MemoryArea {
            hub: Arc::clone(&self.shared),
            scope: Scope::Session,
            context: id,
        });

        inner.contexts.push(ContextEntry {
            id,
            url: url.clone(),
            hooks: Arc::downgrade(&hooks),
            durable_area: Arc::downgrade(&durable),
            session_area: Arc::downgrade(&session),
        });

        MemoryContext {
            url,
            durable,
            session,
            hooks,
        }
    }
}

/// One simulated execution context sharing the hub's storage.
pub struct MemoryContext {
    url: String,
    durable: Arc<MemoryArea>,
    session: Arc<MemoryArea>,
    hooks: Arc<HookTable>,
}

impl MemoryContext {
    /// The document URL other contexts see in notifications from here.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Number of hooks currently registered by this context.
    pub fn hook_count(&self) -> usize {
        self.hooks.hooks.read().len()
    }
}

impl Host for MemoryContext {
    fn area(&self, scope: Scope) -> Option<Arc<dyn StorageArea>> {
        match scope {
            Scope::Durable => Some(Arc::clone(&self.durable) as Arc<dyn StorageArea>),
            Scope::Session => Some(Arc::clone(&self.session) as Arc<dyn StorageArea>),
        }
    }

    fn notifications(&self) -> Arc<dyn NotificationSource> {
        Arc::clone(&self.hooks) as Arc<dyn NotificationSource>
    }
}

#[derive(Default)]
struct HookTable {
    hooks: RwLock<BTreeMap<u64, Arc<NotificationHook>>>,
    next: AtomicU64,
}

impl HookTable {
    fn snapshot(&self) -> Vec<Arc<NotificationHook>> {
        self.hooks.read().values().cloned().collect()
    }
}

impl NotificationSource for HookTable {
    fn add_hook(&self, hook: NotificationHook) -> HookId {
        let id = self.next.fetch_add(1, Ordering::SeqCst);
        self.hooks.write().insert(id, Arc::new(hook));
        HookId(id)
    }

    fn remove_hook(&self, id: HookId) {
        self.hooks.write().remove(&id.0);
    }
}

struct MemoryArea {
    hub: Arc<HubShared>,
    scope: Scope,
    context: u64,
}

impl StorageArea for MemoryArea {
    fn len(&self) -> usize {
        self.hub.inner.read().map(self.scope).len()
    }

    fn key_at(&self, index: usize) -> Option<String> {
        self.hub
            .inner
            .read()
            .map(self.scope)
            .keys()
            .nth(index)
            .cloned()
    }

    fn get(&self, key: &str) -> Option<String> {
        self.hub.inner.read().map(self.scope).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let (deliveries, old) = {
            let mut inner = self.hub.inner.write();
            let old = inner
                .map_mut(self.scope)
                .insert(key.to_owned(), value.to_owned());
            // A write that leaves the value unchanged notifies nobody.
            if old.as_deref() == Some(value) {
                return;
            }
            (inner.fanout(self.context, self.scope), old)
        };
        for delivery in &deliveries {
            delivery.dispatch(Some(key), old.as_deref(), Some(value));
        }
    }

    fn remove(&self, key: &str) {
        let (deliveries, old) = {
            let mut inner = self.hub.inner.write();
            let Some(old) = inner.map_mut(self.scope).remove(key) else {
                return;
            };
            (inner.fanout(self.context, self.scope), old)
        };
        for delivery in &deliveries {
            delivery.dispatch(Some(key), Some(&old), None);
        }
    }

    fn clear(&self) {
        let deliveries = {
            let mut inner = self.hub.inner.write();
            let map = inner.map_mut(self.scope);
            if map.is_empty() {
                return;
            }
            map.clear();
            inner.fanout(self.context, self.scope)
        };
        for delivery in &deliveries {
            delivery.dispatch(None, None, None);
        }
    }
}
