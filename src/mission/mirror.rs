use std::collections::HashMap;

use crate::config::KeySpace;
use crate::error::Result;
use crate::mission::Mission;
use crate::store::{CoordinationStore, EventKind, WatchEvent};

/// Local, eventually-consistent replica of mission definitions and their
/// next-execution timestamps.
///
/// Strictly a cache of last-observed store state, never a second source
/// of truth: it is populated by a bulk load, kept current by watch
/// events, and re-bulk-loaded to heal watch-stream gaps. Callers hold it
/// behind one `RwLock` so event application, bulk loads, and scheduler
/// scans never interleave.
#[derive(Debug)]
pub struct MissionMirror {
    keys: KeySpace,
    missions: HashMap<String, Mission>,
    /// mission id -> next due time, Unix seconds
    next_exec: HashMap<String, i64>,
}

impl MissionMirror {
    pub fn new(keys: KeySpace) -> Self {
        Self {
            keys,
            missions: HashMap::new(),
            next_exec: HashMap::new(),
        }
    }

    /// Replace the mirror contents with a full read of both prefixes.
    ///
    /// Run once at startup before the node is considered caught up, and
    /// again whenever a watch stream breaks, so no update is permanently
    /// missed. Individual undecodable entries are logged and skipped.
    pub async fn bulk_load(&mut self, store: &dyn CoordinationStore) -> Result<()> {
        let missions = store.get_prefix(&self.keys.mission_prefix()).await?;
        let next_exec = store.get_prefix(&self.keys.next_exec_prefix()).await?;

        self.missions.clear();
        self.next_exec.clear();
        for kv in &missions {
            self.apply_mission_put(&kv.key, &kv.value);
        }
        for kv in &next_exec {
            self.apply_next_exec_put(&kv.key, &kv.value);
        }
        tracing::info!(
            missions = self.missions.len(),
            next_exec = self.next_exec.len(),
            "mirror loaded"
        );
        Ok(())
    }

    /// Apply one watch event. Events under a key outside the known
    /// prefixes are logged and ignored.
    pub fn apply(&mut self, event: &WatchEvent) {
        if self.keys.mission_id_from_key(&event.key).is_some() {
            match event.kind {
                EventKind::Put => self.apply_mission_put(&event.key, &event.value),
                EventKind::Delete => self.apply_mission_delete(&event.key),
            }
        } else if self.keys.next_exec_id_from_key(&event.key).is_some() {
            match event.kind {
                EventKind::Put => self.apply_next_exec_put(&event.key, &event.value),
                EventKind::Delete => self.apply_next_exec_delete(&event.key),
            }
        } else {
            tracing::warn!(key = %event.key, "ignoring event outside known prefixes");
        }
    }

    fn apply_mission_put(&mut self, key: &str, value: &str) {
        let Some(id) = self.keys.mission_id_from_key(key) else {
            return;
        };
        match serde_json::from_str::<Mission>(value) {
            Ok(mission) => {
                let id = id.to_string();
                // A (re)written mission is due immediately: drop any stale
                // next-due entry observed before this definition.
                self.next_exec.remove(&id);
                tracing::debug!(mission = %id, "mission upserted");
                self.missions.insert(id, mission);
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "skipping undecodable mission");
            }
        }
    }

    fn apply_mission_delete(&mut self, key: &str) {
        if let Some(id) = self.keys.mission_id_from_key(key) {
            self.missions.remove(id);
            self.next_exec.remove(id);
            tracing::debug!(mission = %id, "mission removed");
        }
    }

    fn apply_next_exec_put(&mut self, key: &str, value: &str) {
        let Some(id) = self.keys.next_exec_id_from_key(key) else {
            return;
        };
        match value.parse::<i64>() {
            Ok(timestamp) => {
                self.next_exec.insert(id.to_string(), timestamp);
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "skipping non-numeric next execution time");
            }
        }
    }

    fn apply_next_exec_delete(&mut self, key: &str) {
        if let Some(id) = self.keys.next_exec_id_from_key(key) {
            self.next_exec.remove(id);
        }
    }

    /// Snapshot of all mission definitions.
    pub fn missions(&self) -> Vec<Mission> {
        self.missions.values().cloned().collect()
    }

    pub fn mission_count(&self) -> usize {
        self.missions.len()
    }

    pub fn get(&self, mission_id: &str) -> Option<&Mission> {
        self.missions.get(mission_id)
    }

    /// Recorded next due time for a mission. Absence means the mission
    /// has never executed and is due immediately.
    pub fn next_due(&self, mission_id: &str) -> Option<i64> {
        self.next_exec.get(mission_id).copied()
    }

    /// Write-through from the scheduler after it persists a new next due
    /// time, so the mission is not re-evaluated before the watch echo.
    pub fn set_next_due(&mut self, mission_id: &str, timestamp: i64) {
        self.next_exec.insert(mission_id.to_string(), timestamp);
    }

    /// Missions matching an owner, and optionally a serial number.
    pub fn missions_for_owner(&self, owner: &str, no: Option<i64>) -> Vec<Mission> {
        self.missions
            .values()
            .filter(|m| m.owner == owner && no.is_none_or(|n| m.no == n))
            .cloned()
            .collect()
    }
}
