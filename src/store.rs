//! Typed wrapper around one host storage area.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, StoreError};
use crate::events::{ChangeBridge, ChangeEvent, EventStream, Subscription};
use crate::host::StorageArea;

/// Handle to one origin-scoped key-value area.
///
/// Every operation is a pass-through call to the host facility; nothing is
/// cached locally. Cloning is cheap and clones share identity: equality is
/// the identity of the underlying area handle, never entry contents, so a
/// store resolved from a [`ChangeEvent`] compares equal to the process's own
/// handle for the same area.
///
/// Mutations made through this handle are visible to this process only via
/// subsequent reads; notifying *other* contexts is the platform's job, and
/// the notifications consumed here come exclusively from other contexts.
#[derive(Clone)]
pub struct Store {
    area: Arc<dyn StorageArea>,
    bridge: ChangeBridge,
}

impl Store {
    pub(crate) fn new(area: Arc<dyn StorageArea>, bridge: ChangeBridge) -> Self {
        Self { area, bridge }
    }

    /// Current value for the key; `None` when absent. The empty string is a
    /// present value.
    pub fn get(&self, key: &str) -> Option<String> {
        self.area.get(key)
    }

    /// Get and JSON-decode the value for the key.
    ///
    /// Fails with [`StoreError::AbsentKey`] when the key does not exist and
    /// [`StoreError::Decode`] when parsing fails.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let raw = self
            .get(key)
            .ok_or_else(|| StoreError::AbsentKey(key.to_string()))?;
        serde_json::from_str(&raw).map_err(StoreError::Decode)
    }

    /// Unconditional upsert.
    pub fn set(&self, key: &str, value: &str) {
        self.area.set(key, value);
    }

    /// JSON-encode and store the value.
    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let encoded = serde_json::to_string(value).map_err(StoreError::Encode)?;
        self.set(key, &encoded);
        Ok(())
    }

    /// Remove the key if present; no-op otherwise.
    pub fn remove(&self, key: &str) {
        self.area.remove(key);
    }

    /// Remove all entries.
    pub fn clear(&self) {
        self.area.clear();
    }

    /// Current entry count.
    pub fn len(&self) -> usize {
        self.area.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.area.is_empty()
    }

    /// Key at the given index, or `None` when `index >= len()`.
    ///
    /// Key order may change across any mutation, not just mutations of the
    /// key in question.
    pub fn key_at(&self, index: usize) -> Option<String> {
        self.area.key_at(index)
    }

    /// Snapshot of all keys. Entries mutated concurrently by another context
    /// may be missed or duplicated, as with any straddling enumeration.
    pub fn keys(&self) -> Vec<String> {
        let mut keys = Vec::with_capacity(self.len());
        let mut index = 0;
        while let Some(key) = self.key_at(index) {
            keys.push(key);
            index += 1;
        }
        keys
    }

    /// Subscribe a callback to mutations of this store by other contexts.
    pub fn on_change(
        &self,
        callback: impl Fn(&ChangeEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.bridge
            .on_change_filtered(Arc::clone(&self.area), Arc::new(callback))
    }

    /// Subscribe a new rendezvous channel to mutations of this store.
    pub fn listen(&self) -> EventStream {
        self.bridge.listen_filtered(Arc::clone(&self.area))
    }

    /// Subscribe an existing channel sender to mutations of this store.
    /// Lets several stores multiplex into one channel.
    pub fn listen_on(&self, sender: crossbeam_channel::Sender<ChangeEvent>) -> Subscription {
        self.bridge
            .listen_on_filtered(Arc::clone(&self.area), sender)
    }

    /// Whether both stores wrap the same underlying area.
    pub fn same_area(&self, other: &Store) -> bool {
        Arc::ptr_eq(&self.area, &other.area)
    }

    /// The raw host handle this store wraps.
    pub fn area(&self) -> &Arc<dyn StorageArea> {
        &self.area
    }
}

impl PartialEq for Store {
    fn eq(&self, other: &Self) -> bool {
        self.same_area(other)
    }
}

impl Eq for Store {}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Store({:p})", Arc::as_ptr(&self.area))
    }
}
