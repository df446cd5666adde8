//! Event and subscription types for change notifications.

use crate::error::{Result, StoreError};
use crate::host::RawNotification;
use crate::store::Store;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use url::Url;

use super::bridge::ChangeBridge;

/// Unique identifier for a subscriber within a bridge.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct SubscriberId(pub u64);

/// One external mutation notification, parsed and ready for delivery.
///
/// Events are immutable once constructed; subscribers receive clones of the
/// read-only view and must treat the fields as shared. An absent field is a
/// first-class state, not an error: a `None` key means the whole area was
/// cleared, a `None` old value means the key was inserted, a `None` new
/// value means it was removed.
#[derive(Clone, Debug)]
pub struct ChangeEvent {
    key: Option<String>,
    old_value: Option<String>,
    new_value: Option<String>,
    origin: Option<Store>,
    url: Option<String>,
}

impl ChangeEvent {
    /// Parse a raw host notification, rejecting contradictory shapes.
    pub(crate) fn from_raw(raw: RawNotification, bridge: &ChangeBridge) -> Result<Self> {
        if raw.key.is_none() && (raw.old_value.is_some() || raw.new_value.is_some()) {
            return Err(StoreError::MalformedNotification(
                "clear notification carries values".to_string(),
            ));
        }
        if raw.key.is_some() && raw.old_value.is_none() && raw.new_value.is_none() {
            return Err(StoreError::MalformedNotification(
                "keyed notification carries no values".to_string(),
            ));
        }

        Ok(Self {
            key: raw.key,
            old_value: raw.old_value,
            new_value: raw.new_value,
            origin: raw.area.map(|area| Store::new(area, bridge.clone())),
            url: raw.url,
        })
    }

    /// The mutated key, or `None` when the area was cleared.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Whether this event reports a full clear of the area.
    pub fn is_clear(&self) -> bool {
        self.key.is_none()
    }

    /// Value before the mutation; `None` on insert or clear.
    pub fn old_value(&self) -> Option<&str> {
        self.old_value.as_deref()
    }

    /// Value after the mutation; `None` on removal or clear.
    pub fn new_value(&self) -> Option<&str> {
        self.new_value.as_deref()
    }

    /// Decode the old value as JSON.
    ///
    /// Fails with [`StoreError::AbsentField`] when there is no old value and
    /// [`StoreError::Decode`] when parsing fails.
    pub fn old_json<T: DeserializeOwned>(&self) -> Result<T> {
        let raw = self
            .old_value
            .as_deref()
            .ok_or(StoreError::AbsentField("oldValue"))?;
        serde_json::from_str(raw).map_err(StoreError::Decode)
    }

    /// Decode the new value as JSON; errors as [`old_json`](Self::old_json).
    pub fn new_json<T: DeserializeOwned>(&self) -> Result<T> {
        let raw = self
            .new_value
            .as_deref()
            .ok_or(StoreError::AbsentField("newValue"))?;
        serde_json::from_str(raw).map_err(StoreError::Decode)
    }

    /// The store whose area was mutated, identity-comparable with the
    /// process's own store handles.
    pub fn store(&self) -> Result<&Store> {
        self.origin.as_ref().ok_or(StoreError::AbsentField("storageArea"))
    }

    /// Location of the document that performed the mutation, if known.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Parse the originating document location.
    ///
    /// An absent URL ([`StoreError::AbsentField`]) and an unparseable URL
    /// ([`StoreError::InvalidUrl`]) are observably different host states and
    /// are reported as distinct errors.
    pub fn parse_url(&self) -> Result<Url> {
        let raw = self.url.as_deref().ok_or(StoreError::AbsentField("url"))?;
        Url::parse(raw).map_err(|source| StoreError::InvalidUrl {
            url: raw.to_string(),
            source,
        })
    }
}

/// Handle to a live registration with the bridge.
///
/// Cancelling stops future delivery to this subscriber; when the last
/// subscriber of a bridge cancels, the external hook is released. `cancel`
/// is idempotent and also runs on drop. A notification already in flight
/// when `cancel` is called may still be delivered; nothing after.
pub struct Subscription {
    id: SubscriberId,
    bridge: ChangeBridge,
    cancelled: AtomicBool,
}

impl Subscription {
    pub(crate) fn new(id: SubscriberId, bridge: ChangeBridge) -> Self {
        Self {
            id,
            bridge,
            cancelled: AtomicBool::new(false),
        }
    }

    /// This subscriber's id.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Stop future event delivery and release the external hook if this was
    /// the last live subscription.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            self.bridge.unsubscribe(self.id);
        }
    }

    /// Whether `cancel` has run.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Channel-backed subscription.
///
/// Delivery is rendezvous-style: the notifying context blocks until this
/// stream's reader takes the event, so keep a reader active for every live
/// stream. Dropping the stream cancels the subscription and disconnects the
/// channel.
pub struct EventStream {
    receiver: crossbeam_channel::Receiver<ChangeEvent>,
    subscription: Subscription,
}

impl EventStream {
    pub(crate) fn new(
        receiver: crossbeam_channel::Receiver<ChangeEvent>,
        subscription: Subscription,
    ) -> Self {
        Self {
            receiver,
            subscription,
        }
    }

    /// Receive the next event (blocking).
    pub fn recv(&self) -> std::result::Result<ChangeEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> std::result::Result<ChangeEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> std::result::Result<ChangeEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Blocking iterator over incoming events.
    pub fn iter(&self) -> crossbeam_channel::Iter<'_, ChangeEvent> {
        self.receiver.iter()
    }

    /// Cancel the underlying subscription; the channel stays readable for
    /// anything already delivered.
    pub fn cancel(&self) {
        self.subscription.cancel();
    }

    /// The underlying subscription handle.
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryHub;
    use crate::host::Host;

    fn test_bridge() -> ChangeBridge {
        let hub = MemoryHub::new();
        ChangeBridge::new(hub.context().notifications())
    }

    fn raw(
        key: Option<&str>,
        old: Option<&str>,
        new: Option<&str>,
        url: Option<&str>,
    ) -> RawNotification {
        RawNotification {
            key: key.map(str::to_owned),
            old_value: old.map(str::to_owned),
            new_value: new.map(str::to_owned),
            area: None,
            url: url.map(str::to_owned),
        }
    }

    #[test]
    fn test_clear_with_values_is_malformed() {
        let bridge = test_bridge();
        let result = ChangeEvent::from_raw(raw(None, None, Some("v"), None), &bridge);
        assert!(matches!(result, Err(StoreError::MalformedNotification(_))));
    }

    #[test]
    fn test_keyed_without_values_is_malformed() {
        let bridge = test_bridge();
        let result = ChangeEvent::from_raw(raw(Some("k"), None, None, None), &bridge);
        assert!(matches!(result, Err(StoreError::MalformedNotification(_))));
    }

    #[test]
    fn test_clear_event_shape() {
        let bridge = test_bridge();
        let event = ChangeEvent::from_raw(raw(None, None, None, None), &bridge).unwrap();
        assert!(event.is_clear());
        assert_eq!(event.key(), None);
        assert_eq!(event.old_value(), None);
        assert_eq!(event.new_value(), None);
    }

    #[test]
    fn test_absent_store_reference() {
        let bridge = test_bridge();
        let event =
            ChangeEvent::from_raw(raw(Some("k"), None, Some("v"), None), &bridge).unwrap();
        assert!(matches!(
            event.store(),
            Err(StoreError::AbsentField("storageArea"))
        ));
    }

    #[test]
    fn test_url_absent_vs_invalid() {
        let bridge = test_bridge();

        let absent =
            ChangeEvent::from_raw(raw(Some("k"), None, Some("v"), None), &bridge).unwrap();
        assert_eq!(absent.url(), None);
        assert!(matches!(
            absent.parse_url(),
            Err(StoreError::AbsentField("url"))
        ));

        let invalid = ChangeEvent::from_raw(
            raw(Some("k"), None, Some("v"), Some("not a url")),
            &bridge,
        )
        .unwrap();
        assert_eq!(invalid.url(), Some("not a url"));
        assert!(matches!(
            invalid.parse_url(),
            Err(StoreError::InvalidUrl { .. })
        ));

        let valid = ChangeEvent::from_raw(
            raw(Some("k"), None, Some("v"), Some("https://example.com/page")),
            &bridge,
        )
        .unwrap();
        let parsed = valid.parse_url().unwrap();
        assert_eq!(parsed.host_str(), Some("example.com"));
    }

    #[test]
    fn test_value_json_accessors() {
        let bridge = test_bridge();
        let event = ChangeEvent::from_raw(
            raw(Some("k"), Some("{\"n\": 1}"), Some("not json"), None),
            &bridge,
        )
        .unwrap();

        let old: serde_json::Value = event.old_json().unwrap();
        assert_eq!(old["n"], 1);

        let bad: Result<serde_json::Value> = event.new_json();
        assert!(matches!(bad, Err(StoreError::Decode(_))));

        let insert =
            ChangeEvent::from_raw(raw(Some("k"), None, Some("1"), None), &bridge).unwrap();
        let missing: Result<serde_json::Value> = insert.old_json();
        assert!(matches!(missing, Err(StoreError::AbsentField("oldValue"))));
    }
}
