use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, RwLock};

use crate::error::Result;
use crate::store::{CoordinationStore, KeyValue, LeaseId, WatchEvent};

#[derive(Debug, Clone)]
struct Record {
    value: String,
    lease: Option<LeaseId>,
}

struct MemInner {
    data: BTreeMap<String, Record>,
    /// lease id -> wall-clock expiry
    leases: HashMap<i64, DateTime<Utc>>,
    next_lease_id: i64,
    watchers: Vec<(String, mpsc::Sender<WatchEvent>)>,
}

/// In-memory `CoordinationStore` with wall-clock lease expiry.
///
/// Intended for tests and single-process local development; not persisted
/// and not replicated.
#[derive(Clone)]
pub struct MemStore {
    inner: Arc<RwLock<MemInner>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MemInner {
                data: BTreeMap::new(),
                leases: HashMap::new(),
                next_lease_id: 1,
                watchers: Vec::new(),
            })),
        }
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemInner {
    /// Drop keys whose lease has expired, notifying watchers of each
    /// removal the way a real store would.
    fn purge_expired(&mut self, now: DateTime<Utc>) {
        let live = &self.leases;
        let expired: Vec<String> = self
            .data
            .iter()
            .filter(|(_, record)| {
                record
                    .lease
                    .is_some_and(|l| live.get(&l.0).is_none_or(|expiry| *expiry <= now))
            })
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            self.data.remove(&key);
            self.notify(WatchEvent::delete(key));
        }
        self.leases.retain(|_, expiry| *expiry > now);
    }

    fn notify(&mut self, event: WatchEvent) {
        self.watchers.retain(|(prefix, tx)| {
            if !event.key.starts_with(prefix.as_str()) {
                return true;
            }
            match tx.try_send(event.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(key = %event.key, "watch channel full, dropping event");
                    true
                }
                // Receiver dropped: subscription cancelled.
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });
    }
}

#[async_trait]
impl CoordinationStore for MemStore {
    async fn get_prefix(&self, prefix: &str) -> Result<Vec<KeyValue>> {
        let mut inner = self.inner.write().await;
        inner.purge_expired(Utc::now());
        Ok(inner
            .data
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, record)| KeyValue {
                key: key.clone(),
                value: record.value.clone(),
            })
            .collect())
    }

    async fn put(&self, key: &str, value: &str, lease: Option<LeaseId>) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.purge_expired(Utc::now());
        inner.data.insert(
            key.to_string(),
            Record {
                value: value.to_string(),
                lease,
            },
        );
        inner.notify(WatchEvent::put(key, value));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.purge_expired(Utc::now());
        if inner.data.remove(key).is_some() {
            inner.notify(WatchEvent::delete(key));
        }
        Ok(())
    }

    async fn grant(&self, ttl_secs: i64) -> Result<LeaseId> {
        let mut inner = self.inner.write().await;
        let id = inner.next_lease_id;
        inner.next_lease_id += 1;
        inner
            .leases
            .insert(id, Utc::now() + chrono::Duration::seconds(ttl_secs.max(1)));
        Ok(LeaseId(id))
    }

    async fn watch(&self, prefix: &str) -> Result<mpsc::Receiver<WatchEvent>> {
        let (tx, rx) = mpsc::channel(64);
        self.inner
            .write()
            .await
            .watchers
            .push((prefix.to_string(), tx));
        Ok(rx)
    }
}
