//! Process-level entry point wiring host, stores, and bridge together.

use std::sync::Arc;

use crate::error::{Result, StoreError};
use crate::events::{ChangeBridge, ChangeEvent, EventStream, Subscription};
use crate::host::Host;
use crate::store::Store;
use crate::types::Scope;

/// The client over one host platform.
///
/// Both scoped stores are resolved exactly once, at construction; a scope
/// the host does not expose stays unavailable for the life of the process
/// and is reported as [`StoreError::ScopeUnavailable`], never silently
/// replaced with an empty store.
///
/// Global subscriptions registered here observe mutations of every
/// available scope; use the [`Store`] subscription methods to filter to one
/// scope. Both ride the same dispatcher, so ordering and filtering
/// guarantees are identical.
pub struct StorageClient {
    durable: Option<Store>,
    session: Option<Store>,
    bridge: ChangeBridge,
}

impl StorageClient {
    /// Resolve stores and set up the (still dormant) change bridge.
    ///
    /// No hook is registered with the host until the first subscription.
    pub fn new(host: Arc<dyn Host>) -> Self {
        let bridge = ChangeBridge::new(host.notifications());
        let resolve = |scope| {
            host.area(scope)
                .map(|area| Store::new(area, bridge.clone()))
        };
        Self {
            durable: resolve(Scope::Durable),
            session: resolve(Scope::Session),
            bridge,
        }
    }

    /// The store for a scope.
    pub fn store(&self, scope: Scope) -> Result<&Store> {
        let store = match scope {
            Scope::Durable => self.durable.as_ref(),
            Scope::Session => self.session.as_ref(),
        };
        store.ok_or(StoreError::ScopeUnavailable(scope))
    }

    /// The durable store.
    pub fn durable(&self) -> Result<&Store> {
        self.store(Scope::Durable)
    }

    /// The session store.
    pub fn session(&self) -> Result<&Store> {
        self.store(Scope::Session)
    }

    /// Whether the host exposes the scope.
    pub fn is_available(&self, scope: Scope) -> bool {
        self.store(scope).is_ok()
    }

    /// Subscribe a callback to mutations of any scope by other contexts.
    pub fn on_change(
        &self,
        callback: impl Fn(&ChangeEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.bridge.on_change(callback)
    }

    /// Subscribe a new rendezvous channel to mutations of any scope.
    pub fn listen(&self) -> EventStream {
        self.bridge.listen()
    }

    /// Subscribe an existing channel sender to mutations of any scope.
    pub fn listen_on(&self, sender: crossbeam_channel::Sender<ChangeEvent>) -> Subscription {
        self.bridge.listen_on(sender)
    }

    /// The underlying dispatcher.
    pub fn bridge(&self) -> &ChangeBridge {
        &self.bridge
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryHub;
    use crate::host::{NotificationSource, StorageArea};

    #[test]
    fn test_scopes_resolved_once() {
        let hub = MemoryHub::new();
        let client = StorageClient::new(Arc::new(hub.context()));

        for scope in Scope::ALL {
            assert!(client.is_available(scope));
        }

        let a = client.durable().unwrap();
        let b = client.store(Scope::Durable).unwrap();
        assert!(a.same_area(b));
        assert!(!a.same_area(client.session().unwrap()));
    }

    #[test]
    fn test_unavailable_scope_is_an_error() {
        let hub = MemoryHub::new();
        let ctx = hub.context();

        struct NoSession(crate::host::memory::MemoryContext);
        impl Host for NoSession {
            fn area(&self, scope: Scope) -> Option<Arc<dyn StorageArea>> {
                match scope {
                    Scope::Durable => self.0.area(scope),
                    Scope::Session => None,
                }
            }
            fn notifications(&self) -> Arc<dyn NotificationSource> {
                self.0.notifications()
            }
        }

        let client = StorageClient::new(Arc::new(NoSession(ctx)));
        assert!(client.durable().is_ok());
        assert!(!client.is_available(Scope::Session));
        assert!(matches!(
            client.session(),
            Err(StoreError::ScopeUnavailable(Scope::Session))
        ));
    }
}
