// /////////////////////////////////////////////////////////////////////////////
// Object Vault
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Message bus wrapper (§4.13, §4.14, §6) over `rumqttc`. The Scaling
//! Publisher publishes to `lb/scale/request`; the Host Controller
//! subscribes to it. QoS is at-least-once, so the Host Controller's
//! count-based reconciliation (§4.14, property 8) must tolerate
//! duplicate deliveries.

use std::time::Duration;

use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::sync::broadcast;

use objectvault_domain::ObjectVaultError;

pub const SCALE_TOPIC: &str = "lb/scale/request";

pub type ScaleEventSubscription = broadcast::Receiver<Vec<u8>>;

pub struct MessageBus {
    client: AsyncClient,
    incoming: broadcast::Sender<Vec<u8>>,
}

impl MessageBus {
    /// Connects to the broker and spawns the event-loop poll task that
    /// drives both outbound publishes and inbound message delivery.
    pub fn connect(host: &str, port: u16, client_id: &str) -> Self {
        let mut options = MqttOptions::new(client_id, host, port);
        options.set_keep_alive(Duration::from_secs(30));

        let (client, mut event_loop) = AsyncClient::new(options, 64);
        let (incoming_tx, _) = broadcast::channel(256);
        let forward = incoming_tx.clone();

        tokio::spawn(async move {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let _ = forward.send(publish.payload.to_vec());
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "mqtt event loop error, retrying");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        Self {
            client,
            incoming: incoming_tx,
        }
    }

    pub async fn publish_json(&self, topic: &str, payload: &impl serde::Serialize) -> Result<(), ObjectVaultError> {
        let bytes = serde_json::to_vec(payload)
            .map_err(|e| ObjectVaultError::Internal(format!("scale event serialization failed: {e}")))?;
        self.client
            .publish(topic, QoS::AtLeastOnce, false, bytes)
            .await
            .map_err(|e| ObjectVaultError::Transport(format!("mqtt publish to {topic} failed: {e}")))
    }

    pub async fn subscribe(&self, topic: &str) -> Result<ScaleEventSubscription, ObjectVaultError> {
        self.client
            .subscribe(topic, QoS::AtLeastOnce)
            .await
            .map_err(|e| ObjectVaultError::Transport(format!("mqtt subscribe to {topic} failed: {e}")))?;
        Ok(self.incoming.subscribe())
    }
}
