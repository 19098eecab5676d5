pub mod etcd;
pub mod mem;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;

pub use etcd::EtcdStore;
pub use mem::MemStore;

/// Handle to a store-managed lease. Keys written under a lease are removed
/// by the store when the lease expires without renewal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseId(pub i64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Put,
    Delete,
}

/// A single change event observed on a watched prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: EventKind,
    pub key: String,
    /// Empty for delete events.
    pub value: String,
}

impl WatchEvent {
    pub fn put(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Put,
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Delete,
            key: key.into(),
            value: String::new(),
        }
    }
}

/// Capability interface to the replicated coordination store.
///
/// The store is the single source of truth; per-call failures are
/// recoverable and must never corrupt the caller's in-memory state.
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// Ordered snapshot of all key/value pairs under a prefix.
    async fn get_prefix(&self, prefix: &str) -> Result<Vec<KeyValue>>;

    /// Upsert a key, optionally bound to a lease.
    async fn put(&self, key: &str, value: &str, lease: Option<LeaseId>) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Obtain a time-bound lease. Implementations clamp the TTL up to the
    /// store's minimum lease granularity rather than rejecting it.
    async fn grant(&self, ttl_secs: i64) -> Result<LeaseId>;

    /// Subscribe to change events under a prefix. The stream stays live
    /// until the receiver is dropped or the underlying connection breaks;
    /// the channel closing signals a gap the caller must heal by
    /// re-reading the prefix.
    async fn watch(&self, prefix: &str) -> Result<mpsc::Receiver<WatchEvent>>;
}
