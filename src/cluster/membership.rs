use crate::config::KeySpace;
use crate::error::Result;
use crate::store::CoordinationStore;

/// Role this node holds in the cluster, recomputed atomically each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Member,
    Master,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Member => write!(f, "member"),
            Role::Master => write!(f, "master"),
        }
    }
}

/// Ordered view of the live fleet, derived purely from the heartbeat
/// records this node can observe.
///
/// Election needs no message exchange beyond those reads: the node with
/// the minimum live ID is master. A stale read can briefly convince two
/// nodes they are master; the window is bounded by the tick period and
/// resolved by the next recomputation.
#[derive(Debug)]
pub struct Membership {
    node_id: i64,
    role: Role,
    members: Vec<i64>,
}

impl Membership {
    pub fn new(node_id: i64) -> Self {
        Self {
            node_id,
            role: Role::Member,
            members: Vec::new(),
        }
    }

    pub fn node_id(&self) -> i64 {
        self.node_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_master(&self) -> bool {
        self.role == Role::Master
    }

    pub fn members(&self) -> &[i64] {
        &self.members
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Recompute role from a liveness snapshot.
    ///
    /// An empty snapshot (possible right after startup, before this
    /// node's own heartbeat lands) leaves the previous role and member
    /// list untouched rather than electing nobody.
    pub fn update(&mut self, mut live_ids: Vec<i64>) {
        if live_ids.is_empty() {
            tracing::debug!("empty liveness snapshot, keeping current role");
            return;
        }
        live_ids.sort_unstable();

        let new_role = if live_ids[0] == self.node_id {
            Role::Master
        } else {
            Role::Member
        };
        if new_role != self.role {
            tracing::info!(
                node_id = self.node_id,
                role = %new_role,
                members = live_ids.len(),
                "role changed"
            );
        }
        self.role = new_role;
        self.members = live_ids;
    }
}

/// Read all live heartbeat records and parse their node IDs. Malformed
/// values are logged and skipped rather than failing the read.
pub async fn read_live_members(
    store: &dyn CoordinationStore,
    keys: &KeySpace,
) -> Result<Vec<i64>> {
    let records = store.get_prefix(&keys.heartbeat_prefix()).await?;
    let mut ids = Vec::with_capacity(records.len());
    for kv in records {
        match kv.value.parse::<i64>() {
            Ok(id) => ids.push(id),
            Err(e) => {
                tracing::warn!(key = %kv.key, error = %e, "skipping malformed heartbeat record");
            }
        }
    }
    Ok(ids)
}
