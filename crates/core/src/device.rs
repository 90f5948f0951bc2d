// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device Registry (spec.md §3, §4.3, §4.4): the authoritative in-memory
//! store of device configuration, connectivity, health, and actuator
//! state, plus the smart-toggle group decision.

use std::collections::HashMap;

use crate::click::Actor;
use crate::context::ContextReader;
use crate::watchdog::WatchdogResult;

/// One known device's full state (spec.md §3).
#[derive(Debug, Clone, Default)]
pub struct DeviceState {
    pub connected: bool,
    pub is_healthy: bool,
    pub is_stale: bool,
    pub alert_sent: bool,
    pub last_seen_time: u64,
    pub last_boot_time: u64,
    pub last_details_time: u64,
    pub actuators_ids: Vec<String>,
    pub buttons_ids: Vec<String>,
    pub actuator_states: Vec<bool>,
    pub actuator_indexes: HashMap<String, usize>,
}

impl DeviceState {
    /// A device with `lastSeenTime == 0` has never been observed on the bus.
    pub fn never_seen(&self) -> bool {
        self.last_seen_time == 0
    }
}

/// Details announced on a device's `conf` topic (spec.md §4.3).
#[derive(Debug, Clone, Default)]
pub struct DeviceDetails {
    pub actuators_ids: Vec<String>,
    pub buttons_ids: Vec<String>,
}

/// Result of [`DeviceRegistry::register_device_details`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetailsChange {
    pub changed: bool,
}

/// Result of [`DeviceRegistry::register_actuator_states`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatesChange {
    pub is_new: bool,
    pub changed: bool,
    pub config_is_missing: bool,
}

/// Result of [`DeviceRegistry::update_connection_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionChange {
    pub state_changed: bool,
    pub connected: bool,
    pub came_online: bool,
    pub went_offline: bool,
}

/// Result of [`DeviceRegistry::record_boot`], [`DeviceRegistry::record_ping_response`],
/// [`DeviceRegistry::update_health_from_result`] and [`DeviceRegistry::record_alert_sent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateChanged {
    pub state_changed: bool,
    pub came_online: bool,
}

/// Error raised internally by [`DeviceRegistry::register_actuator_states`]
/// when a schema is known and the incoming array length disagrees
/// (spec.md §4.3, §7). Converted to a [`crate::error::ServiceError`] at the
/// handler boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateLengthMismatch {
    pub expected: usize,
    pub got: usize,
}

/// Outcome of [`DeviceRegistry::smart_toggle`] (spec.md §4.4).
#[derive(Debug, Clone, Default)]
pub struct SmartToggleResult {
    pub state_to_set: bool,
    pub active: u32,
    pub total: u32,
    pub warning: Option<String>,
}

/// Authoritative device store. Devices are created on first reference
/// ("create-on-write", spec.md §3).
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: HashMap<String, DeviceState>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, name: &str) -> &mut DeviceState {
        self.devices.entry(name.to_owned()).or_default()
    }

    pub fn get(&self, name: &str) -> Option<&DeviceState> {
        self.devices.get(name)
    }

    pub fn register_device_details(
        &mut self,
        name: &str,
        details: &DeviceDetails,
        now_ms: u64,
    ) -> DetailsChange {
        let device = self.entry(name);

        let ids_changed = device.actuators_ids != details.actuators_ids
            || device.buttons_ids != details.buttons_ids;

        let states_reset = if device.actuator_states.len() != details.actuators_ids.len() {
            device.actuator_states = vec![false; details.actuators_ids.len()];
            true
        } else {
            false
        };

        device.actuators_ids = details.actuators_ids.clone();
        device.buttons_ids = details.buttons_ids.clone();
        device.actuator_indexes =
            details.actuators_ids.iter().enumerate().map(|(i, id)| (id.clone(), i)).collect();
        device.last_seen_time = now_ms;
        device.last_details_time = now_ms;

        DetailsChange { changed: ids_changed || states_reset }
    }

    pub fn register_actuator_states(
        &mut self,
        name: &str,
        states: &[bool],
        now_ms: u64,
    ) -> Result<StatesChange, StateLengthMismatch> {
        let is_new = !self.devices.contains_key(name);
        let device = self.entry(name);
        let config_is_missing = device.last_details_time == 0;

        if !config_is_missing && states.len() != device.actuators_ids.len() {
            return Err(StateLengthMismatch { expected: device.actuators_ids.len(), got: states.len() });
        }

        let changed = device.actuator_states != states;
        device.actuator_states = states.to_vec();
        device.last_seen_time = now_ms;

        Ok(StatesChange { is_new, changed, config_is_missing })
    }

    pub fn update_connection_state(
        &mut self,
        name: &str,
        homie_state: &str,
        now_ms: u64,
    ) -> ConnectionChange {
        let is_ready = homie_state == "ready";
        let device = self.entry(name);

        if is_ready == device.connected {
            return ConnectionChange {
                state_changed: false,
                connected: device.connected,
                came_online: false,
                went_offline: false,
            };
        }

        let came_online = is_ready;
        let went_offline = !is_ready;
        device.connected = is_ready;
        if is_ready {
            device.is_healthy = true;
            device.is_stale = false;
            device.alert_sent = false;
        } else {
            device.is_healthy = false;
            device.is_stale = false;
        }
        device.last_seen_time = now_ms;

        ConnectionChange { state_changed: true, connected: is_ready, came_online, went_offline }
    }

    pub fn record_boot(&mut self, name: &str, now_ms: u64) -> StateChanged {
        let device = self.entry(name);
        let changed =
            !device.connected || !device.is_healthy || device.is_stale;
        device.connected = true;
        device.is_healthy = true;
        device.is_stale = false;
        device.last_boot_time = now_ms;
        device.last_seen_time = now_ms;
        StateChanged { state_changed: changed, came_online: false }
    }

    pub fn record_ping_response(&mut self, name: &str, now_ms: u64) -> StateChanged {
        let device = self.entry(name);
        if !device.is_healthy || device.is_stale {
            device.is_healthy = true;
            device.is_stale = false;
            device.alert_sent = false;
            device.last_seen_time = now_ms;
            return StateChanged { state_changed: true, came_online: true };
        }
        StateChanged::default()
    }

    pub fn update_health_from_result(&mut self, name: &str, result: &WatchdogResult) -> StateChanged {
        let Some(device) = self.devices.get_mut(name) else {
            return StateChanged::default();
        };

        match result {
            WatchdogResult::Ok => {
                if !device.is_healthy || device.is_stale {
                    device.is_healthy = true;
                    device.is_stale = false;
                    return StateChanged { state_changed: true, came_online: false };
                }
                StateChanged::default()
            }
            WatchdogResult::Stale => {
                if !device.is_stale {
                    device.is_stale = true;
                    return StateChanged { state_changed: true, came_online: false };
                }
                StateChanged::default()
            }
            WatchdogResult::Unhealthy { .. } => {
                if device.is_healthy || device.is_stale {
                    device.is_healthy = false;
                    device.is_stale = false;
                    return StateChanged { state_changed: true, came_online: false };
                }
                StateChanged::default()
            }
            WatchdogResult::NeedsPing => StateChanged::default(),
        }
    }

    pub fn record_alert_sent(&mut self, name: &str) -> StateChanged {
        let device = self.entry(name);
        if device.alert_sent {
            return StateChanged::default();
        }
        device.alert_sent = true;
        device.is_healthy = false;
        StateChanged { state_changed: true, came_online: false }
    }

    pub fn prune(&mut self, name: &str) {
        self.devices.remove(name);
    }

    pub fn prune_not_in(&mut self, names: &std::collections::HashSet<String>) {
        self.devices.retain(|name, _| names.contains(name));
    }

    /// Defensive deep copy for external exposure (spec.md §9: "Deep-copy on
    /// export").
    pub fn snapshot(&self) -> HashMap<String, DeviceState> {
        self.devices.clone()
    }

    pub fn device_names(&self) -> impl Iterator<Item = &String> {
        self.devices.keys()
    }

    /// Threshold-majority group decision (spec.md §4.4).
    pub fn smart_toggle(
        &self,
        actors: &[Actor],
        other_actors: &[String],
        other_devices_prefix: &str,
        context: &dyn ContextReader,
    ) -> SmartToggleResult {
        let mut active: u32 = 0;
        let mut total: u32 = 0;

        for actor in actors {
            let Some(device) = self.devices.get(&actor.name) else { continue };

            if actor.all_actuators {
                total += device.actuator_states.len() as u32;
                active += device.actuator_states.iter().filter(|s| **s).count() as u32;
            } else {
                for actuator_id in &actor.actuators {
                    if let Some(&idx) = device.actuator_indexes.get(actuator_id) {
                        if let Some(&state) = device.actuator_states.get(idx) {
                            total += 1;
                            if state {
                                active += 1;
                            }
                        }
                    }
                }
            }
        }

        let mut other_warnings: Vec<String> = Vec::new();
        for name in other_actors {
            let key = format!("{other_devices_prefix}.{name}.state");
            match context.read_bool(&key) {
                Some(state) => {
                    total += 1;
                    if state {
                        active += 1;
                    }
                }
                None => {
                    other_warnings.push(format!("No boolean state available for external actor '{name}'."));
                }
            }
        }

        let other_warning = if other_warnings.is_empty() { None } else { Some(other_warnings.join(" ")) };

        if total == 0 {
            let warning = other_warning
                .or_else(|| Some("Smart Toggle: No valid actuators found to calculate state.".to_owned()));
            return SmartToggleResult { state_to_set: false, active: 0, total: 0, warning };
        }

        let state_to_set = (active as f64) < (total as f64) / 2.0;
        SmartToggleResult { state_to_set, active, total, warning: other_warning }
    }
}

#[cfg(test)]
#[path = "device_tests.rs"]
mod tests;
