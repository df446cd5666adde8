//! Core types for the storage client.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two logical key-value namespaces provided by the host.
///
/// These are the only scopes that exist; both are resolved exactly once when
/// the [`StorageClient`](crate::StorageClient) is built.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Persists across sessions for the origin.
    Durable,
    /// Lives only as long as the session.
    Session,
}

impl Scope {
    /// Both scopes, in resolution order.
    pub const ALL: [Scope; 2] = [Scope::Durable, Scope::Session];

    /// Stable name used in host lookups and log output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Durable => "durable",
            Scope::Session => "session",
        }
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scope({})", self.as_str())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
