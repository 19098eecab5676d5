use async_trait::async_trait;
use etcd_client::{Client, EventType, GetOptions, PutOptions, WatchOptions};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::store::{CoordinationStore, EventKind, KeyValue, LeaseId, WatchEvent};

/// etcd rejects no TTL below this; shorter grants are clamped up.
const MIN_LEASE_TTL_SECS: i64 = 5;

/// Buffered events per watch stream before backpressure applies.
const WATCH_CHANNEL_CAPACITY: usize = 64;

/// Coordination store backed by an etcd cluster.
pub struct EtcdStore {
    client: Client,
}

impl EtcdStore {
    /// Connect to the etcd endpoints. A connection failure here is fatal
    /// to the caller: no useful coordination is possible without the store.
    pub async fn connect(endpoints: &[String]) -> Result<Self> {
        let client = Client::connect(endpoints, None).await?;
        tracing::info!(endpoints = ?endpoints, "connected to coordination store");
        Ok(Self { client })
    }
}

#[async_trait]
impl CoordinationStore for EtcdStore {
    async fn get_prefix(&self, prefix: &str) -> Result<Vec<KeyValue>> {
        let mut client = self.client.clone();
        let resp = client
            .get(prefix, Some(GetOptions::new().with_prefix()))
            .await?;

        let mut pairs = Vec::with_capacity(resp.kvs().len());
        for kv in resp.kvs() {
            match (kv.key_str(), kv.value_str()) {
                (Ok(key), Ok(value)) => pairs.push(KeyValue {
                    key: key.to_string(),
                    value: value.to_string(),
                }),
                _ => {
                    tracing::warn!(prefix, "skipping non-utf8 key/value pair");
                }
            }
        }
        Ok(pairs)
    }

    async fn put(&self, key: &str, value: &str, lease: Option<LeaseId>) -> Result<()> {
        let mut client = self.client.clone();
        let options = lease.map(|l| PutOptions::new().with_lease(l.0));
        client.put(key, value, options).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut client = self.client.clone();
        client.delete(key, None).await?;
        Ok(())
    }

    async fn grant(&self, ttl_secs: i64) -> Result<LeaseId> {
        let mut client = self.client.clone();
        let resp = client
            .lease_grant(ttl_secs.max(MIN_LEASE_TTL_SECS), None)
            .await?;
        Ok(LeaseId(resp.id()))
    }

    async fn watch(&self, prefix: &str) -> Result<mpsc::Receiver<WatchEvent>> {
        let mut client = self.client.clone();
        let (watcher, mut stream) = client
            .watch(prefix, Some(WatchOptions::new().with_prefix()))
            .await?;

        let (tx, rx) = mpsc::channel(WATCH_CHANNEL_CAPACITY);
        let prefix = prefix.to_string();
        tokio::spawn(async move {
            // Keep the watcher alive for the lifetime of the stream; dropping
            // it cancels the server-side watch.
            let _watcher = watcher;
            loop {
                match stream.message().await {
                    Ok(Some(resp)) => {
                        for event in resp.events() {
                            let Some(kv) = event.kv() else { continue };
                            let (Ok(key), Ok(value)) = (kv.key_str(), kv.value_str()) else {
                                tracing::warn!(prefix = %prefix, "ignoring non-utf8 watch event");
                                continue;
                            };
                            let kind = match event.event_type() {
                                EventType::Put => EventKind::Put,
                                EventType::Delete => EventKind::Delete,
                            };
                            let forwarded = tx
                                .send(WatchEvent {
                                    kind,
                                    key: key.to_string(),
                                    value: value.to_string(),
                                })
                                .await;
                            if forwarded.is_err() {
                                // Receiver dropped: subscription cancelled.
                                return;
                            }
                        }
                    }
                    Ok(None) => {
                        tracing::warn!(prefix = %prefix, "watch stream ended");
                        return;
                    }
                    Err(e) => {
                        tracing::warn!(prefix = %prefix, error = %e, "watch stream failed");
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }
}
