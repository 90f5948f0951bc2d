// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! MQTT transport — connects to the broker, subscribes to the Homie and LSH
//! topic trees, and hands inbound messages to the caller while exposing an
//! outbound publish helper. Built on `rumqttc`'s client/event-loop split the
//! same way the teacher's NATS transport split publisher construction from
//! its `run` loop.

use rand::Rng;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;

use crate::config::Config;

/// One inbound MQTT message, decoded only as far as UTF-8.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub topic: String,
    pub payload: String,
}

/// Thin wrapper around a connected `rumqttc` client plus the subscriptions
/// the orchestrator needs.
pub struct MqttTransport {
    client: AsyncClient,
}

impl MqttTransport {
    /// Connect to the broker and subscribe to the Homie `$state` tree and
    /// the full LSH topic tree. Returns the transport plus a channel of
    /// decoded inbound messages fed by the background event-loop task.
    pub fn connect(config: &Config) -> (Self, mpsc::UnboundedReceiver<Inbound>, tokio::task::JoinHandle<()>) {
        let mut options = MqttOptions::new(&config.mqtt_client_id, &config.mqtt_host, config.mqtt_port);
        options.set_keep_alive(config.mqtt_keep_alive());
        if let (Some(user), Some(pass)) = (&config.mqtt_username, &config.mqtt_password) {
            options.set_credentials(user, pass);
        }

        let (client, mut event_loop) = AsyncClient::new(options, 256);
        let (tx, rx) = mpsc::unbounded_channel();

        let homie_filter = format!("{}+/$state", config.homie_base);
        let lsh_filter = format!("{}#", config.lsh_base);

        let sub_client = client.clone();
        let homie_filter_task = homie_filter.clone();
        let lsh_filter_task = lsh_filter.clone();
        tokio::spawn(async move {
            if let Err(e) = sub_client.subscribe(&homie_filter_task, QoS::AtLeastOnce).await {
                tracing::error!(topic = %homie_filter_task, "mqtt: initial subscribe failed: {e}");
            }
            if let Err(e) = sub_client.subscribe(&lsh_filter_task, QoS::AtLeastOnce).await {
                tracing::error!(topic = %lsh_filter_task, "mqtt: initial subscribe failed: {e}");
            }
        });

        let handle = tokio::spawn(async move {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let payload = match std::str::from_utf8(&publish.payload) {
                            Ok(s) => s.to_owned(),
                            Err(e) => {
                                tracing::warn!(topic = %publish.topic, "mqtt: non-utf8 payload dropped: {e}");
                                continue;
                            }
                        };
                        if tx.send(Inbound { topic: publish.topic, payload }).is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!("mqtt: event loop error, retrying: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                    }
                }
            }
        });

        (Self { client }, rx, handle)
    }

    pub async fn publish(&self, topic: &str, payload: &str) {
        if let Err(e) = self.client.publish(topic, QoS::AtLeastOnce, false, payload.as_bytes()).await {
            tracing::warn!(topic, "mqtt: publish failed: {e}");
        }
    }

    /// Publishes the same payload to each device's own ping topic, staggered
    /// by a random 50-250ms delay per message so a large fleet doesn't wake
    /// up on the same broker tick (spec.md §4.7).
    pub async fn publish_staggered(&self, topic_payload_pairs: Vec<(String, String)>) {
        for (topic, payload) in topic_payload_pairs {
            let delay_ms = rand::rng().random_range(50..=250);
            tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
            self.publish(&topic, &payload).await;
        }
    }
}
