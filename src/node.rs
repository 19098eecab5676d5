use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::api::{run_api, ApiState};
use crate::bus::EventBus;
use crate::cluster::{membership, HeartbeatPublisher, Membership};
use crate::config::{KeySpace, NodeConfig};
use crate::error::Result;
use crate::mission::{MissionMirror, Scheduler};
use crate::store::CoordinationStore;

/// Backoff before resubscribing after a watch stream breaks.
const WATCH_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Main node that wires all components together.
///
/// Every peer runs this same orchestration; whether the scheduling pass
/// actually runs on a given tick is decided by the election result for
/// that tick.
pub struct Node {
    config: NodeConfig,
    keys: KeySpace,
    store: Arc<dyn CoordinationStore>,
    heartbeat: HeartbeatPublisher,
    membership: Arc<RwLock<Membership>>,
    mirror: Arc<RwLock<MissionMirror>>,
    scheduler: Scheduler,
}

impl Node {
    pub fn new(
        config: NodeConfig,
        node_id: i64,
        store: Arc<dyn CoordinationStore>,
        bus: Arc<dyn EventBus>,
    ) -> Self {
        let keys = config.key_space();
        Self {
            heartbeat: HeartbeatPublisher::new(node_id, config.heartbeat_period_secs, &keys),
            membership: Arc::new(RwLock::new(Membership::new(node_id))),
            mirror: Arc::new(RwLock::new(MissionMirror::new(keys.clone()))),
            scheduler: Scheduler::new(
                keys.clone(),
                store.clone(),
                bus,
                config.bus.topic.clone(),
            ),
            keys,
            store,
            config,
        }
    }

    pub fn node_id(&self) -> i64 {
        self.heartbeat.node_id()
    }

    /// Shared mirror handle, read-only by convention outside the core.
    pub fn mirror(&self) -> Arc<RwLock<MissionMirror>> {
        self.mirror.clone()
    }

    pub fn membership(&self) -> Arc<RwLock<Membership>> {
        self.membership.clone()
    }

    /// Run the node until the shutdown token fires.
    ///
    /// Startup order matters: the first heartbeat and the initial bulk
    /// load must succeed before anything else starts. A node that cannot
    /// reach the store at startup is useless and exits with the error.
    /// After that, two watch listeners and the admin API run as spawned
    /// tasks while this call drives the tick loop.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        self.heartbeat.send_heartbeat(self.store.as_ref()).await?;
        self.mirror
            .write()
            .await
            .bulk_load(self.store.as_ref())
            .await?;

        for prefix in [self.keys.mission_prefix(), self.keys.next_exec_prefix()] {
            tokio::spawn(Self::watch_loop(
                self.store.clone(),
                self.mirror.clone(),
                prefix,
                shutdown.clone(),
            ));
        }

        if let Some(addr) = self.config.http_addr {
            let state = ApiState {
                node_id: self.node_id(),
                keys: self.keys.clone(),
                store: self.store.clone(),
                mirror: self.mirror.clone(),
                membership: self.membership.clone(),
            };
            tokio::spawn(run_api(addr, state, shutdown.clone()));
        }

        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.heartbeat_period_secs));
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("shutdown requested, stopping tick loop");
                    return Ok(());
                }
                _ = interval.tick() => self.tick().await,
            }
        }
    }

    /// One tick: heartbeat, then election, then (master only) a
    /// scheduling pass. The heartbeat goes first so this node's own
    /// liveness is visible in the read its election is about to use.
    async fn tick(&self) {
        if let Err(e) = self.heartbeat.send_heartbeat(self.store.as_ref()).await {
            tracing::warn!(
                error = %e,
                "heartbeat failed, peers may see this node as dead until the next tick"
            );
        }

        match membership::read_live_members(self.store.as_ref(), &self.keys).await {
            Ok(live_ids) => self.membership.write().await.update(live_ids),
            Err(e) => {
                tracing::warn!(error = %e, "membership read failed, keeping current role");
            }
        }

        if self.membership.read().await.is_master() {
            self.scheduler.check_missions(&self.mirror).await;
        }
    }

    /// Long-lived watch listener for one prefix. A broken stream is
    /// healed by re-running the bulk load before resubscribing, so a gap
    /// never leaves the mirror permanently behind.
    async fn watch_loop(
        store: Arc<dyn CoordinationStore>,
        mirror: Arc<RwLock<MissionMirror>>,
        prefix: String,
        shutdown: CancellationToken,
    ) {
        loop {
            let mut events = match store.watch(&prefix).await {
                Ok(events) => events,
                Err(e) => {
                    tracing::warn!(prefix = %prefix, error = %e, "watch subscribe failed");
                    tokio::select! {
                        _ = shutdown.cancelled() => return,
                        _ = tokio::time::sleep(WATCH_RETRY_BACKOFF) => continue,
                    }
                }
            };

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => return,
                    event = events.recv() => match event {
                        Some(event) => mirror.write().await.apply(&event),
                        None => {
                            tracing::warn!(prefix = %prefix, "watch stream closed");
                            break;
                        }
                    }
                }
            }

            if let Err(e) = mirror.write().await.bulk_load(store.as_ref()).await {
                tracing::warn!(prefix = %prefix, error = %e, "mirror reload failed");
            }
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(WATCH_RETRY_BACKOFF) => {}
            }
        }
    }
}
