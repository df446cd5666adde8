//! Host platform boundary.
//!
//! The crate does not implement storage itself. A [`Host`] supplies, per
//! [`Scope`], an origin-shared [`StorageArea`] (or `None` when the platform
//! does not expose that scope) together with a [`NotificationSource`] that
//! fires whenever *another* execution context sharing an area mutates it.
//! Same-context mutations never notify the context that performed them; that
//! is a contract of the host, not of this crate.
//!
//! [`memory`] provides the in-memory reference host used by the test suite
//! and by native embedders.

pub mod memory;

use crate::types::Scope;
use std::sync::Arc;

/// One origin-shared key-value area, as exposed by the host platform.
///
/// All operations are pass-through: the host serializes its own calls and
/// reports existence via `Option`, with the empty string being a value like
/// any other. Key order as seen through [`key_at`](StorageArea::key_at) may
/// change across any mutation.
pub trait StorageArea: Send + Sync {
    /// Current number of entries.
    fn len(&self) -> usize;

    /// Whether the area holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Key at the given index, or `None` when `index >= len()`.
    fn key_at(&self, index: usize) -> Option<String>;

    /// Value for the key, or `None` when the key is absent.
    fn get(&self, key: &str) -> Option<String>;

    /// Unconditional upsert.
    fn set(&self, key: &str, value: &str);

    /// Remove the key if present; no-op otherwise.
    fn remove(&self, key: &str);

    /// Remove all entries.
    fn clear(&self);
}

/// One mutation notification as delivered by the host, before parsing.
///
/// `key == None` signals that the area was cleared. `area` references the
/// *receiving* context's handle for the mutated scope, which is what makes
/// identity filtering possible.
#[derive(Clone)]
pub struct RawNotification {
    pub key: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub area: Option<Arc<dyn StorageArea>>,
    pub url: Option<String>,
}

/// Callback registered with a [`NotificationSource`].
pub type NotificationHook = Box<dyn Fn(RawNotification) + Send + Sync>;

/// Identifies one registered hook for later removal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct HookId(pub u64);

/// The host's mutation-notification registration point.
///
/// Registration is add/remove style: adding is cheap and hands back a
/// [`HookId`]; removal is explicit, idempotent, and releases whatever the
/// host allocated for the hook. Implementations must not call back into the
/// registering party from `add_hook`/`remove_hook`.
pub trait NotificationSource: Send + Sync {
    /// Register a hook; it will be invoked once per external mutation.
    fn add_hook(&self, hook: NotificationHook) -> HookId;

    /// Remove a previously registered hook. Unknown ids are ignored.
    fn remove_hook(&self, id: HookId);
}

/// The full host platform: scoped storage areas plus the notification source.
pub trait Host: Send + Sync {
    /// The area for a scope, or `None` when the host does not expose it.
    ///
    /// Must return the same handle identity on every call for a given scope;
    /// the returned `Arc` is what store identity is based on.
    fn area(&self, scope: Scope) -> Option<Arc<dyn StorageArea>>;

    /// The notification source shared by all areas of this host.
    fn notifications(&self) -> Arc<dyn NotificationSource>;
}
