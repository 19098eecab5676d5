use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, MqttOptions, QoS};
use tokio_util::sync::CancellationToken;

use crate::config::BusConfig;
use crate::error::Result;

use super::EventBus;

const KEEP_ALIVE: Duration = Duration::from_secs(5);
const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

/// Event bus backed by an MQTT broker.
///
/// Trigger events are published at QoS 1: the broker acknowledges each
/// message, matching the at-least-once dispatch semantics of the
/// scheduler.
pub struct MqttBus {
    client: AsyncClient,
}

impl MqttBus {
    /// Create the client and spawn its connection event loop. The loop
    /// reconnects with a fixed backoff until the shutdown token fires.
    pub fn connect(config: &BusConfig, client_id: &str, shutdown: CancellationToken) -> Self {
        let mut options = MqttOptions::new(client_id, &config.host, config.port);
        options.set_keep_alive(KEEP_ALIVE);

        let (client, mut event_loop) = AsyncClient::new(options, 32);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::info!("bus event loop stopping");
                        return;
                    }
                    polled = event_loop.poll() => {
                        if let Err(e) = polled {
                            tracing::warn!(error = %e, "bus connection error, retrying");
                            tokio::time::sleep(RECONNECT_BACKOFF).await;
                        }
                    }
                }
            }
        });

        Self { client }
    }
}

#[async_trait]
impl EventBus for MqttBus {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await?;
        Ok(())
    }
}
