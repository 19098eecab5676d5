use std::sync::Arc;

use chrono::Local;
use tokio::sync::RwLock;

use crate::bus::EventBus;
use crate::config::KeySpace;
use crate::mission::schedule::calc_after_timestamp;
use crate::mission::{Mission, MissionMirror, TriggerEvent};
use crate::store::CoordinationStore;

/// Master-only scheduling pass.
///
/// Each tick the pass scans a locked snapshot of the mirror, reschedules
/// every due mission in the store, then dispatches one trigger event per
/// due mission to the bus. Dispatch is at-least-once: a failed store
/// write re-triggers next tick, while a failed publish after a
/// successful write is lost until the mission's next natural due time.
pub struct Scheduler {
    keys: KeySpace,
    store: Arc<dyn CoordinationStore>,
    bus: Arc<dyn EventBus>,
    topic: String,
}

impl Scheduler {
    pub fn new(
        keys: KeySpace,
        store: Arc<dyn CoordinationStore>,
        bus: Arc<dyn EventBus>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            keys,
            store,
            bus,
            topic: topic.into(),
        }
    }

    /// Run one pass over the mirror. Failures are isolated per mission:
    /// one mission failing to persist or publish never aborts the pass.
    pub async fn check_missions(&self, mirror: &RwLock<MissionMirror>) {
        let now = Local::now();
        let now_ts = now.timestamp();

        // Snapshot under the read lock; a mission with no recorded next
        // due time has never executed and is due immediately.
        let due: Vec<Mission> = {
            let mirror = mirror.read().await;
            mirror
                .missions()
                .into_iter()
                .filter(|m| mirror.next_due(&m.id).is_none_or(|due| now_ts >= due))
                .collect()
        };

        if !due.is_empty() {
            tracing::debug!(due = due.len(), "scheduling pass");
        }

        for mission in due {
            let Some(next) = calc_after_timestamp(mission.duration, mission.duration_unit, now)
            else {
                tracing::warn!(
                    mission = %mission.id,
                    unit = %mission.duration_unit,
                    "no valid next execution, mission not rescheduled"
                );
                continue;
            };
            let next_ts = next.timestamp();

            let key = self.keys.next_exec_key(&mission.id);
            if let Err(e) = self.store.put(&key, &next_ts.to_string(), None).await {
                tracing::warn!(
                    mission = %mission.id,
                    error = %e,
                    "failed to persist next execution time, will retry next tick"
                );
                continue;
            }
            mirror.write().await.set_next_due(&mission.id, next_ts);

            let event = TriggerEvent {
                mission: mission.clone(),
                dispatched_at: now_ts,
            };
            let payload = match serde_json::to_vec(&event) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!(mission = %mission.id, error = %e, "failed to encode trigger");
                    continue;
                }
            };
            if let Err(e) = self.bus.publish(&self.topic, payload).await {
                // Not rolled back: the mission fires again at its next
                // natural due time, not before.
                tracing::warn!(mission = %mission.id, error = %e, "trigger publish failed");
                continue;
            }

            tracing::info!(mission = %mission.id, next_due = next_ts, "mission dispatched");
        }
    }
}
