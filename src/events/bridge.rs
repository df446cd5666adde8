//! The change bridge: single hook registration, parsing, and fan-out.

use crossbeam_channel::{bounded, Sender};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::events::types::{ChangeEvent, EventStream, SubscriberId, Subscription};
use crate::host::{HookId, NotificationSource, RawNotification, StorageArea};

/// Callback sink signature.
pub(crate) type Callback = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

#[derive(Clone)]
enum Sink {
    Callback(Callback),
    Channel(Sender<ChangeEvent>),
}

struct Subscriber {
    /// `None` subscribes globally; `Some` filters by area identity.
    filter: Option<Arc<dyn StorageArea>>,
    sink: Sink,
}

/// Dispatcher between the host's notification source and subscribers.
///
/// The bridge registers exactly one hook with the host, on the first
/// subscription; every later subscription reuses it, so all subscribers see
/// every notification exactly once and in host order. The live-subscriber
/// map is the reference count: when the last subscription cancels, the hook
/// is deregistered and its resources released.
///
/// Raw notifications are parsed before any delivery; malformed shapes are
/// logged and dropped, never surfaced to subscribers and never fatal.
/// Delivery walks subscribers in registration order: global subscribers get
/// every event, area-filtered subscribers only events whose origin area
/// matches theirs by handle identity. A panicking callback subscriber is
/// caught and logged without affecting the others; a channel subscriber
/// whose receiver is gone is pruned, which counts as cancellation.
///
/// Cloning is cheap and shares the dispatcher.
#[derive(Clone)]
pub struct ChangeBridge {
    shared: Arc<BridgeShared>,
}

struct BridgeShared {
    source: Arc<dyn NotificationSource>,
    next_id: AtomicU64,
    state: RwLock<BridgeState>,
}

#[derive(Default)]
struct BridgeState {
    hook: Option<HookId>,
    subscribers: BTreeMap<SubscriberId, Subscriber>,
}

impl ChangeBridge {
    /// Create a bridge over the host's notification source.
    ///
    /// Nothing is registered with the host until the first subscription.
    pub fn new(source: Arc<dyn NotificationSource>) -> Self {
        Self {
            shared: Arc::new(BridgeShared {
                source,
                next_id: AtomicU64::new(1),
                state: RwLock::new(BridgeState::default()),
            }),
        }
    }

    /// Subscribe a callback to every event.
    pub fn on_change(
        &self,
        callback: impl Fn(&ChangeEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.register(None, Sink::Callback(Arc::new(callback)))
    }

    /// Subscribe a new rendezvous channel to every event.
    pub fn listen(&self) -> EventStream {
        let (sender, receiver) = bounded(0);
        let subscription = self.register(None, Sink::Channel(sender));
        EventStream::new(receiver, subscription)
    }

    /// Subscribe an existing channel sender to every event.
    pub fn listen_on(&self, sender: Sender<ChangeEvent>) -> Subscription {
        self.register(None, Sink::Channel(sender))
    }

    pub(crate) fn on_change_filtered(
        &self,
        area: Arc<dyn StorageArea>,
        callback: Callback,
    ) -> Subscription {
        self.register(Some(area), Sink::Callback(callback))
    }

    pub(crate) fn listen_filtered(&self, area: Arc<dyn StorageArea>) -> EventStream {
        let (sender, receiver) = bounded(0);
        let subscription = self.register(Some(area), Sink::Channel(sender));
        EventStream::new(receiver, subscription)
    }

    pub(crate) fn listen_on_filtered(
        &self,
        area: Arc<dyn StorageArea>,
        sender: Sender<ChangeEvent>,
    ) -> Subscription {
        self.register(Some(area), Sink::Channel(sender))
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.shared.state.read().subscribers.len()
    }

    fn register(&self, filter: Option<Arc<dyn StorageArea>>, sink: Sink) -> Subscription {
        let id = SubscriberId(self.shared.next_id.fetch_add(1, Ordering::SeqCst));

        let mut state = self.shared.state.write();
        if state.hook.is_none() {
            let weak = Arc::downgrade(&self.shared);
            let hook = self.shared.source.add_hook(Box::new(move |raw| {
                if let Some(shared) = weak.upgrade() {
                    BridgeShared::dispatch(&shared, raw);
                }
            }));
            debug!(hook = hook.0, "registered external hook");
            state.hook = Some(hook);
        }
        state.subscribers.insert(id, Subscriber { filter, sink });

        Subscription::new(id, self.clone())
    }

    pub(crate) fn unsubscribe(&self, id: SubscriberId) {
        let mut state = self.shared.state.write();
        if state.subscribers.remove(&id).is_some() && state.subscribers.is_empty() {
            if let Some(hook) = state.hook.take() {
                self.shared.source.remove_hook(hook);
                debug!(hook = hook.0, "released external hook");
            }
        }
    }
}

impl BridgeShared {
    fn dispatch(shared: &Arc<BridgeShared>, raw: RawNotification) {
        let bridge = ChangeBridge {
            shared: Arc::clone(shared),
        };

        let event = match ChangeEvent::from_raw(raw, &bridge) {
            Ok(event) => event,
            Err(err) => {
                warn!(%err, "dropping notification");
                return;
            }
        };

        // Snapshot, then deliver lock-free, so subscribing and cancelling
        // stay safe while a delivery blocks on a slow consumer. An event
        // in flight here may still reach a subscriber cancelled during
        // delivery; nothing dispatched afterwards will.
        let snapshot: Vec<(SubscriberId, Option<Arc<dyn StorageArea>>, Sink)> = shared
            .state
            .read()
            .subscribers
            .iter()
            .map(|(id, sub)| (*id, sub.filter.clone(), sub.sink.clone()))
            .collect();

        let mut disconnected = Vec::new();
        for (id, filter, sink) in snapshot {
            if let Some(area) = &filter {
                let matches = event
                    .store()
                    .map_or(false, |store| Arc::ptr_eq(store.area(), area));
                if !matches {
                    continue;
                }
            }

            match sink {
                Sink::Callback(callback) => {
                    if catch_unwind(AssertUnwindSafe(|| callback(&event))).is_err() {
                        warn!(subscriber = id.0, "subscriber callback panicked");
                    }
                }
                Sink::Channel(sender) => {
                    if sender.send(event.clone()).is_err() {
                        disconnected.push(id);
                    }
                }
            }
        }

        for id in disconnected {
            bridge.unsubscribe(id);
        }
    }
}
