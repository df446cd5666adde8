//! Error and edge case coverage through the public API.

use std::collections::BTreeMap;
use std::sync::Arc;
use webstash::host::memory::{MemoryContext, MemoryHub};
use webstash::host::{Host, NotificationSource, StorageArea};
use webstash::{Scope, StorageClient, StoreError};

fn client(hub: &MemoryHub) -> StorageClient {
    StorageClient::new(Arc::new(hub.context()))
}

// --- Read Edge Cases ---

#[test]
fn test_absent_key_is_not_an_error_for_plain_get() {
    let hub = MemoryHub::new();
    let client = client(&hub);
    assert_eq!(client.durable().unwrap().get("missing"), None);
    assert_eq!(client.session().unwrap().get("missing"), None);
}

#[test]
fn test_structured_get_distinguishes_absent_from_broken() {
    let hub = MemoryHub::new();
    let client = client(&hub);
    let store = client.durable().unwrap();

    let absent: Result<u32, _> = store.get_json("missing");
    assert!(matches!(absent, Err(StoreError::AbsentKey(key)) if key == "missing"));

    store.set("broken", "{not json");
    let broken: Result<u32, _> = store.get_json("broken");
    assert!(matches!(broken, Err(StoreError::Decode(_))));

    // An empty string is present but still not valid JSON.
    store.set("empty", "");
    let empty: Result<u32, _> = store.get_json("empty");
    assert!(matches!(empty, Err(StoreError::Decode(_))));
}

#[test]
fn test_structured_set_surfaces_encode_failure() {
    let hub = MemoryHub::new();
    let client = client(&hub);
    let store = client.durable().unwrap();

    // Maps with non-string keys cannot be encoded as JSON objects.
    let mut bad = BTreeMap::new();
    bad.insert(vec![1u8, 2], "value");
    let result = store.set_json("bad", &bad);
    assert!(matches!(result, Err(StoreError::Encode(_))));
    assert_eq!(store.get("bad"), None); // nothing was written
}

// --- Unavailable Scopes ---

/// Host that hides the session scope, as some platforms do.
struct NoSession(MemoryContext);

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

#[test]
fn test_unavailable_scope_is_explicit() {
    let hub = MemoryHub::new();
    let client = StorageClient::new(Arc::new(NoSession(hub.context())));

    assert!(client.is_available(Scope::Durable));
    assert!(!client.is_available(Scope::Session));
    assert!(matches!(
        client.session(),
        Err(StoreError::ScopeUnavailable(Scope::Session))
    ));

    // The durable store still works and still sees cross-context events.
    let other = StorageClient::new(Arc::new(hub.context()));
    let seen = Arc::new(parking_lot::Mutex::new(0usize));
    let sink = seen.clone();
    let _sub = client.durable().unwrap().on_change(move |_| {
        *sink.lock() += 1;
    });
    other.durable().unwrap().set("k", "v");
    assert_eq!(*seen.lock(), 1);
}

// --- Event Field Errors ---

#[test]
fn test_unparseable_origin_url_is_distinct_from_absent() {
    let hub = MemoryHub::new();
    let writer = StorageClient::new(Arc::new(hub.context_at("not a url")));
    let reader = client(&hub);

    let outcome = Arc::new(parking_lot::Mutex::new(None));
    let sink = outcome.clone();
    let _sub = reader.on_change(move |event| {
        *sink.lock() = Some((
            event.url().map(str::to_owned),
            event.parse_url().err().map(|e| e.to_string()),
        ));
    });

    writer.durable().unwrap().set("k", "v");

    let (raw, err) = outcome.lock().take().expect("event observed");
    // The raw value is preserved; only parsing fails.
    assert_eq!(raw.as_deref(), Some("not a url"));
    let err = err.expect("parse should fail");
    assert!(err.contains("invalid url"), "unexpected error: {err}");
}
