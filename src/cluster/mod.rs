pub mod heartbeat;
pub mod membership;

pub use heartbeat::HeartbeatPublisher;
pub use membership::{Membership, Role};

/// Generate this process's node identity: a startup timestamp in
/// microseconds. Unique across the fleet with overwhelming probability;
/// collisions are an accepted risk.
pub fn generate_node_id() -> i64 {
    chrono::Utc::now().timestamp_micros()
}
