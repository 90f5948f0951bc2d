// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Home Assistant MQTT-discovery payload generation (spec.md §1's "Home
//! Assistant discovery payload generation" peripheral concern). Emits one
//! discovery config per actuator, published once per device whenever
//! `registerDeviceDetails` reports a change, gated behind
//! [`crate::config::Config::ha_discovery_prefix`].

use serde::Serialize;

/// `homeassistant/switch/<node>/<actuator>/config` payload body. Field
/// names follow Home Assistant's MQTT switch discovery schema.
#[derive(Debug, Serialize)]
pub struct SwitchDiscoveryPayload {
    pub name: String,
    pub unique_id: String,
    pub state_topic: String,
    pub command_topic: String,
    pub payload_on: &'static str,
    pub payload_off: &'static str,
    pub state_on: &'static str,
    pub state_off: &'static str,
    pub optimistic: bool,
    pub qos: u8,
    pub device: DiscoveryDevice,
}

#[derive(Debug, Serialize)]
pub struct DiscoveryDevice {
    pub identifiers: Vec<String>,
    pub name: String,
}

/// Builds one discovery topic/payload pair per actuator on `device_name`.
///
/// `state_topic`/`command_topic` point at the adapter's own mirrored-state
/// topic rather than the device's raw LSH topics, since Home Assistant
/// expects one boolean per actuator and the LSH wire format batches the
/// whole actuator vector (spec.md §6).
pub fn switch_discovery_messages(
    discovery_prefix: &str,
    mirror_base: &str,
    device_name: &str,
    actuators_ids: &[String],
) -> Vec<(String, String)> {
    actuators_ids
        .iter()
        .filter_map(|actuator_id| {
            let unique_id = format!("lsh_{device_name}_{actuator_id}");
            let payload = SwitchDiscoveryPayload {
                name: format!("{device_name} {actuator_id}"),
                unique_id: unique_id.clone(),
                state_topic: format!("{mirror_base}{device_name}/{actuator_id}/state"),
                command_topic: format!("{mirror_base}{device_name}/{actuator_id}/set"),
                payload_on: "true",
                payload_off: "false",
                state_on: "true",
                state_off: "false",
                optimistic: false,
                qos: 1,
                device: DiscoveryDevice {
                    identifiers: vec![format!("lsh_{device_name}")],
                    name: device_name.to_owned(),
                },
            };
            let topic = format!("{discovery_prefix}/switch/{device_name}/{actuator_id}/config");
            serde_json::to_string(&payload).ok().map(|body| (topic, body))
        })
        .collect()
}
