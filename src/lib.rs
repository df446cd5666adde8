//! # webstash
//!
//! Typed access to origin-scoped web storage with live cross-context change
//! events.
//!
//! ## Core Concepts
//!
//! - **Scopes**: exactly two key-value namespaces, durable and
//!   session-lifetime, resolved once per process
//! - **Stores**: pass-through wrappers over the host's storage areas, with
//!   JSON convenience accessors
//! - **Change events**: mutations performed by *other* execution contexts,
//!   parsed into structured events
//! - **Subscriptions**: callback- or channel-based, global or filtered to
//!   one store by identity, with reference-counted hook lifetime
//!
//! ## Example
//!
//! ```ignore
//! use webstash::{StorageClient, host::memory::MemoryHub};
//! use std::sync::Arc;
//!
//! let hub = MemoryHub::new();
//! let client = StorageClient::new(Arc::new(hub.context()));
//!
//! let durable = client.durable()?;
//! durable.set("theme", "dark");
//!
//! // Watch what other contexts do to the durable store.
//! let stream = durable.listen();
//! while let Ok(event) = stream.recv() {
//!     println!("{:?} -> {:?}", event.old_value(), event.new_value());
//! }
//! ```

pub mod client;
pub mod error;
pub mod events;
pub mod host;
pub mod store;
pub mod types;

// Re-exports
pub use client::StorageClient;
pub use error::{Result, StoreError};
pub use events::{ChangeBridge, ChangeEvent, EventStream, SubscriberId, Subscription};
pub use store::Store;
pub use types::Scope;
