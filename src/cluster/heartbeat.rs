use crate::config::KeySpace;
use crate::error::Result;
use crate::store::CoordinationStore;

/// Extra lease time beyond the heartbeat period, tolerating clock and
/// network jitter between renewals.
pub const LEASE_MARGIN_SECS: i64 = 1;

/// Publishes this node's liveness record under a store lease.
///
/// Each call re-issues a lease slightly longer than the heartbeat period
/// and rewrites the record under it, so a node that stops heartbeating
/// disappears from the liveness set once the last lease runs out.
pub struct HeartbeatPublisher {
    node_id: i64,
    period_secs: u64,
    key: String,
}

impl HeartbeatPublisher {
    pub fn new(node_id: i64, period_secs: u64, keys: &KeySpace) -> Self {
        Self {
            node_id,
            period_secs,
            key: keys.heartbeat_key(node_id),
        }
    }

    pub fn node_id(&self) -> i64 {
        self.node_id
    }

    /// Idempotent: calling twice in quick succession refreshes the single
    /// record rather than duplicating it. Fails loudly on store errors;
    /// the tick loop retries next period, so a transient outage only
    /// makes this node look dead to its peers for a while.
    pub async fn send_heartbeat(&self, store: &dyn CoordinationStore) -> Result<()> {
        let ttl = self.period_secs as i64 + LEASE_MARGIN_SECS;
        let lease = store.grant(ttl).await?;
        store
            .put(&self.key, &self.node_id.to_string(), Some(lease))
            .await?;
        tracing::debug!(node_id = self.node_id, lease = lease.0, "heartbeat published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;

    #[tokio::test]
    async fn repeated_heartbeats_leave_one_record() {
        let store = MemStore::new();
        let keys = KeySpace::new("test");
        let publisher = HeartbeatPublisher::new(42, 5, &keys);

        publisher.send_heartbeat(&store).await.unwrap();
        publisher.send_heartbeat(&store).await.unwrap();

        let records = store.get_prefix(&keys.heartbeat_prefix()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, "test/heartbeat/42");
        assert_eq!(records[0].value, "42");
    }
}
