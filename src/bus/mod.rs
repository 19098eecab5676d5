pub mod mqtt;

use async_trait::async_trait;

use crate::error::Result;

pub use mqtt::MqttBus;

/// Capability interface to the message bus trigger events fan out on.
///
/// Publish failures are recoverable per call; the caller logs and moves
/// on rather than aborting its pass.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()>;
}
