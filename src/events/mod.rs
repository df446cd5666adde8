//! Change-notification bridge.
//!
//! Translates the host's push-style mutation notifications into
//! subscriptions this process can consume:
//! - Global subscriptions see every mutation performed by other contexts.
//! - Store-scoped subscriptions see only mutations of one store's area,
//!   matched by handle identity.
//!
//! Both callback and channel subscriptions ride the same dispatch path, so
//! they share ordering and filtering guarantees. Channel delivery is
//! blocking, synchronous, and unbuffered: the notifying context waits until
//! the consumer takes the event, trading backpressure for the obligation to
//! keep a reader active on every live [`EventStream`].
//!
//! # Example
//!
//! ```ignore
//! let client = StorageClient::new(host);
//! let stream = client.durable()?.listen();
//!
//! while let Ok(event) = stream.recv() {
//!     match event.key() {
//!         Some(key) => println!("{key}: {:?} -> {:?}", event.old_value(), event.new_value()),
//!         None => println!("store cleared"),
//!     }
//! }
//! ```

mod bridge;
mod types;

pub use bridge::ChangeBridge;
pub use types::{ChangeEvent, EventStream, SubscriberId, Subscription};
