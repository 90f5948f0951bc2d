// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Topic Router / Orchestrator (spec.md §4.5–§4.8, §6, §7): the component
//! that ties the Device Registry, Click Transaction Manager and Watchdog
//! together behind one message-in, `ServiceResult`-out surface.

use std::collections::HashSet;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use crate::click::{transaction_key, Actor, ClickTransactionManager, ClickType};
use crate::clock::Clock;
use crate::config::SystemConfig;
use crate::context::ContextReader;
use crate::device::{DeviceDetails, DeviceRegistry, DeviceState};
use crate::error::{ClickFailureScope, ServiceError};
use crate::payload::{CommandPayload, MiscPayload, OtherActorsPayload};
use crate::result::{OutputPort, ServiceResult, ServiceResultBuilder};
use crate::validate::Validators;
use crate::watchdog::{Watchdog, WatchdogResult};

/// Everything the orchestrator needs to know about where the bus's topics
/// live (spec.md §4.5, §6).
#[derive(Debug, Clone)]
pub struct TopicLayout {
    pub homie_base: String,
    pub lsh_base: String,
    pub service_topic: String,
    pub other_actors_topic: String,
    pub other_devices_prefix: String,
}

/// Timing knobs that aren't already owned by [`Watchdog`]/
/// [`ClickTransactionManager`] (spec.md §6).
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorTimings {
    pub click_timeout_secs: u64,
    pub interrogate_threshold_secs: u64,
    pub ping_timeout_secs: u64,
}

struct RoutingTable {
    homie_state: Regex,
    lsh_conf: Regex,
    lsh_state: Regex,
    lsh_misc: Regex,
}

impl RoutingTable {
    fn new(layout: &TopicLayout) -> Result<Self, regex::Error> {
        let homie = regex::escape(&layout.homie_base);
        let lsh = regex::escape(&layout.lsh_base);
        Ok(Self {
            homie_state: Regex::new(&format!(r"^{homie}([^/]+)/\$state$"))?,
            lsh_conf: Regex::new(&format!(r"^{lsh}([^/]+)/conf$"))?,
            lsh_state: Regex::new(&format!(r"^{lsh}([^/]+)/state$"))?,
            lsh_misc: Regex::new(&format!(r"^{lsh}([^/]+)/misc$"))?,
        })
    }

    fn route<'a>(&self, topic: &'a str) -> Option<Route> {
        if let Some(caps) = self.homie_state.captures(topic) {
            return Some(Route::HomieState(caps[1].to_owned()));
        }
        if let Some(caps) = self.lsh_conf.captures(topic) {
            return Some(Route::LshConf(caps[1].to_owned()));
        }
        if let Some(caps) = self.lsh_state.captures(topic) {
            return Some(Route::LshState(caps[1].to_owned()));
        }
        if let Some(caps) = self.lsh_misc.captures(topic) {
            return Some(Route::LshMisc(caps[1].to_owned()));
        }
        None
    }
}

enum Route {
    HomieState(String),
    LshConf(String),
    LshState(String),
    LshMisc(String),
}

impl Route {
    fn device_name(&self) -> &str {
        match self {
            Route::HomieState(n) | Route::LshConf(n) | Route::LshState(n) | Route::LshMisc(n) => n,
        }
    }
}

/// The orchestrator: the single entry point an adapter drives (spec.md
/// §4.5). Single-threaded and fully synchronous, as required by §5.
pub struct Orchestrator {
    routes: RoutingTable,
    layout: TopicLayout,
    config: Option<SystemConfig>,
    registry: DeviceRegistry,
    click_manager: ClickTransactionManager,
    watchdog: Watchdog,
    validators: Validators,
    clock: Arc<dyn Clock>,
    context: Arc<dyn ContextReader>,
}

impl Orchestrator {
    /// Builds the orchestrator, compiling its topic-routing regexes from
    /// `layout`. Fails only if `layout`'s base topic strings produce an
    /// invalid pattern once escaped and wrapped — callers should treat a
    /// `regex::Error` here as a configuration error at startup.
    pub fn new(
        layout: TopicLayout,
        timings: OrchestratorTimings,
        clock: Arc<dyn Clock>,
        context: Arc<dyn ContextReader>,
        validators: Validators,
    ) -> Result<Self, regex::Error> {
        let routes = RoutingTable::new(&layout)?;
        Ok(Self {
            routes,
            layout,
            config: None,
            registry: DeviceRegistry::new(),
            click_manager: ClickTransactionManager::new(timings.click_timeout_secs),
            watchdog: Watchdog::new(timings.interrogate_threshold_secs, timings.ping_timeout_secs),
            validators,
            clock,
            context,
        })
    }

    fn lsh_in_topic(&self, device_name: &str) -> String {
        format!("{}{device_name}/IN", self.layout.lsh_base)
    }

    /// Replaces the active configuration, pruning registry entries whose
    /// device is no longer configured (spec.md §3's reload semantics).
    /// Returns a human-readable summary.
    pub fn update_system_config(&mut self, config: SystemConfig) -> String {
        let names = config.device_names();
        self.registry.prune_not_in(&names);
        let device_count = config.devices.len();
        self.config = Some(config);
        format!("Loaded configuration for {device_count} device(s).")
    }

    pub fn clear_system_config(&mut self) {
        self.config = None;
    }

    pub fn get_device_registry(&self) -> std::collections::HashMap<String, DeviceState> {
        self.registry.snapshot()
    }

    pub fn get_configured_device_names(&self) -> HashSet<String> {
        self.config.as_ref().map(SystemConfig::device_names).unwrap_or_default()
    }

    /// Routes one inbound message (spec.md §4.5). `raw_payload` is the plain
    /// Homie state string for homie topics, or JSON text for LSH topics.
    pub fn process_message(&mut self, topic: &str, raw_payload: &str) -> ServiceResult {
        let Some(route) = self.routes.route(topic) else {
            return ServiceResultBuilder::new().log(format!("No route matched for topic '{topic}'.")).build();
        };

        self.watchdog.on_device_activity(route.device_name());

        if self.config.is_none() {
            return ServiceResultBuilder::new().warning("Configuration not loaded, ignoring message.").build();
        }

        match route {
            Route::HomieState(name) => self.handle_homie_state(&name, raw_payload.trim()),
            Route::LshConf(name) => self.handle_lsh_conf(&name, raw_payload),
            Route::LshState(name) => self.handle_lsh_state(&name, raw_payload),
            Route::LshMisc(name) => self.handle_lsh_misc(&name, raw_payload),
        }
    }

    fn handle_homie_state(&mut self, name: &str, raw_state: &str) -> ServiceResult {
        let now = self.clock.now_ms();
        let change = self.registry.update_connection_state(name, raw_state, now);

        let mut builder = ServiceResultBuilder::new().state_changed(change.state_changed);
        if !change.state_changed {
            return builder.build();
        }

        builder = builder.log(format!(
            "Device '{name}' connectivity changed to '{raw_state}' (connected={}).",
            change.connected
        ));

        if change.went_offline {
            builder = builder.alert(format!("Device '{name}' reported as '{raw_state}' by Homie."));
        }

        if change.came_online {
            let topic = self.lsh_in_topic(name);
            builder = builder
                .alert(format!("Device '{name}' has recovered."))
                .message(OutputPort::Lsh, topic.clone(), CommandPayload::SendDeviceDetails)
                .message(OutputPort::Lsh, topic, CommandPayload::SendActuatorsState);
        }

        builder.build()
    }

    fn handle_lsh_conf(&mut self, name: &str, raw_payload: &str) -> ServiceResult {
        let value = match parse_json(raw_payload) {
            Ok(v) => v,
            Err(warning) => return ServiceResultBuilder::new().warning(warning).build(),
        };

        match (self.validators.device_conf)(&value) {
            Err(errors) => ServiceResultBuilder::new().warning(join_validation_errors(errors)).build(),
            Ok(payload) => {
                let now = self.clock.now_ms();
                let details =
                    DeviceDetails { actuators_ids: payload.actuators_ids, buttons_ids: payload.buttons_ids };
                let actuator_count = details.actuators_ids.len();
                let button_count = details.buttons_ids.len();
                let change = self.registry.register_device_details(name, &details, now);

                let mut builder = ServiceResultBuilder::new().state_changed(change.changed);
                if change.changed {
                    builder = builder.log(format!(
                        "Device '{name}' announced configuration: {actuator_count} actuator(s), {button_count} button(s)."
                    ));
                }
                builder.build()
            }
        }
    }

    fn handle_lsh_state(&mut self, name: &str, raw_payload: &str) -> ServiceResult {
        let value = match parse_json(raw_payload) {
            Ok(v) => v,
            Err(warning) => return ServiceResultBuilder::new().warning(warning).build(),
        };

        match (self.validators.device_state)(&value) {
            Err(errors) => ServiceResultBuilder::new().warning(join_validation_errors(errors)).build(),
            Ok(payload) => {
                let now = self.clock.now_ms();
                match self.registry.register_actuator_states(name, &payload.actuator_states, now) {
                    Err(mismatch) => ServiceResultBuilder::new()
                        .error(ServiceError::StateLengthMismatch {
                            device: name.to_owned(),
                            expected: mismatch.expected,
                            got: mismatch.got,
                        })
                        .build(),
                    Ok(change) => {
                        let mut builder = ServiceResultBuilder::new().state_changed(change.changed);
                        if change.is_new {
                            builder = builder
                                .log(format!("Created partial registry entry for previously-unknown device '{name}'."));
                        }
                        if change.config_is_missing {
                            let topic = self.lsh_in_topic(name);
                            builder = builder
                                .warning(format!(
                                    "Received actuator states for '{name}' before its configuration is known."
                                ))
                                .message(OutputPort::Lsh, topic, CommandPayload::SendDeviceDetails);
                        }
                        if change.changed {
                            builder = builder
                                .log(format!("Device '{name}' actuator states: {:?}", payload.actuator_states));
                        }
                        builder.build()
                    }
                }
            }
        }
    }

    fn handle_lsh_misc(&mut self, name: &str, raw_payload: &str) -> ServiceResult {
        let value = match parse_json(raw_payload) {
            Ok(v) => v,
            Err(warning) => return ServiceResultBuilder::new().warning(warning).build(),
        };

        match (self.validators.misc)(&value) {
            Err(errors) => ServiceResultBuilder::new().warning(join_validation_errors(errors)).build(),
            Ok(MiscPayload::Boot) => {
                let now = self.clock.now_ms();
                let change = self.registry.record_boot(name, now);
                ServiceResultBuilder::new()
                    .state_changed(change.state_changed)
                    .log(format!("Device '{name}' reported boot."))
                    .build()
            }
            Ok(MiscPayload::Ping) => {
                let now = self.clock.now_ms();
                let change = self.registry.record_ping_response(name, now);
                let mut builder = ServiceResultBuilder::new().state_changed(change.state_changed);
                if change.came_online {
                    builder = builder.alert(format!("Device '{name}' has recovered."));
                }
                builder.build()
            }
            Ok(MiscPayload::NetworkClick { button_id, click_type, c }) => {
                if c {
                    self.handle_click_confirmation(name, &button_id, click_type)
                } else {
                    self.handle_click_request(name, &button_id, click_type)
                }
            }
        }
    }

    /// Phase 1 of the network-click handshake (spec.md §4.6).
    fn validate_click_request(
        &self,
        device_name: &str,
        button_id: &str,
        click_type: ClickType,
    ) -> Result<(Vec<Actor>, Vec<String>), ServiceError> {
        let config = self.config.as_ref().ok_or(ServiceError::ConfigNotLoaded)?;

        let button = config
            .device(device_name)
            .and_then(|device| device.button_action(button_id, click_type))
            .ok_or_else(|| ServiceError::ClickValidation {
                reason: "No action configured for this button.".to_owned(),
                scope: ClickFailureScope::Click,
            })?;

        if button.actors.is_empty() && button.other_actors.is_empty() {
            return Err(ServiceError::ClickValidation {
                reason: "Action configured with no targets.".to_owned(),
                scope: ClickFailureScope::Click,
            });
        }

        let offline: Vec<&str> = button
            .actors
            .iter()
            .filter(|actor| !matches!(self.registry.get(&actor.name), Some(state) if state.connected))
            .map(|actor| actor.name.as_str())
            .collect();

        if !offline.is_empty() {
            return Err(ServiceError::ClickValidation {
                reason: format!("Target actor(s) are offline: {}.", offline.join(", ")),
                scope: ClickFailureScope::Click,
            });
        }

        Ok((button.actors.clone(), button.other_actors.clone()))
    }

    fn handle_click_request(&mut self, device_name: &str, button_id: &str, click_type: ClickType) -> ServiceResult {
        match self.validate_click_request(device_name, button_id, click_type) {
            Ok((actors, other_actors)) => {
                let now = self.clock.now_ms();
                let key = transaction_key(device_name, button_id, click_type);
                self.click_manager.start(key, actors, other_actors, now);
                ServiceResultBuilder::new()
                    .message(
                        OutputPort::Lsh,
                        self.lsh_in_topic(device_name),
                        CommandPayload::NetworkClickAck { click_type, button_id: button_id.to_owned() },
                    )
                    .build()
            }
            Err(ServiceError::ClickValidation { reason, scope: ClickFailureScope::Click }) => ServiceResultBuilder::new()
                .alert(format!("Device '{device_name}' button '{button_id}': {reason}"))
                .message(
                    OutputPort::Lsh,
                    self.lsh_in_topic(device_name),
                    CommandPayload::ClickFailover { click_type, button_id: button_id.to_owned() },
                )
                .build(),
            Err(err @ ServiceError::ClickValidation { scope: ClickFailureScope::General, .. }) => {
                ServiceResultBuilder::new()
                    .message(OutputPort::Lsh, self.lsh_in_topic(device_name), CommandPayload::GeneralFailover)
                    .error(err)
                    .build()
            }
            Err(ServiceError::ConfigNotLoaded) => {
                ServiceResultBuilder::new().warning("Configuration not loaded, ignoring message.").build()
            }
            Err(other) => ServiceResultBuilder::new().error(other).build(),
        }
    }

    /// Phase 2 of the network-click handshake (spec.md §4.6).
    fn handle_click_confirmation(&mut self, device_name: &str, button_id: &str, click_type: ClickType) -> ServiceResult {
        let key = transaction_key(device_name, button_id, click_type);
        let Some(txn) = self.click_manager.consume(&key) else {
            return ServiceResultBuilder::new()
                .warning(format!("Received confirmation for an expired or unknown click: {key}."))
                .build();
        };

        let mut builder = ServiceResultBuilder::new();

        let state_to_set = match click_type {
            ClickType::SuperLongClick => false,
            ClickType::LongClick => {
                let outcome = self.registry.smart_toggle(
                    &txn.actors,
                    &txn.other_actors,
                    &self.layout.other_devices_prefix,
                    self.context.as_ref(),
                );
                builder = builder.log(format!(
                    "Smart Toggle: {}/{} active. Decision: {}.",
                    outcome.active,
                    outcome.total,
                    if outcome.state_to_set { "ON" } else { "OFF" }
                ));
                if let Some(warning) = outcome.warning {
                    builder = builder.warning(warning);
                }
                outcome.state_to_set
            }
        };

        builder = builder.log("Click confirmed.".to_owned());

        for actor in &txn.actors {
            let Some(device) = self.registry.get(&actor.name) else { continue };
            let topic = self.lsh_in_topic(&actor.name);

            if !actor.all_actuators && actor.actuators.len() == 1 {
                builder = builder.message(
                    OutputPort::Lsh,
                    topic,
                    CommandPayload::ApplySingleActuatorState {
                        actuator_id: actor.actuators[0].clone(),
                        state: state_to_set,
                    },
                );
                continue;
            }

            let mut states = device.actuator_states.clone();
            if actor.all_actuators {
                states.iter_mut().for_each(|s| *s = state_to_set);
            } else {
                for actuator_id in &actor.actuators {
                    if let Some(&idx) = device.actuator_indexes.get(actuator_id) {
                        if let Some(slot) = states.get_mut(idx) {
                            *slot = state_to_set;
                        }
                    }
                }
            }
            builder = builder.message(OutputPort::Lsh, topic, CommandPayload::ApplyAllActuatorsState { states });
        }

        if !txn.other_actors.is_empty() {
            builder = builder.message(
                OutputPort::OtherActors,
                self.layout.other_actors_topic.clone(),
                OtherActorsPayload {
                    other_actors: txn.other_actors.clone(),
                    state_to_set,
                    payload: format!("Set state={state_to_set} for external actors."),
                },
            );
        }

        builder.build()
    }

    /// Removes expired pending clicks, returning a log line if any were
    /// reaped (spec.md §4.2, §4.5).
    pub fn cleanup_pending_clicks(&mut self) -> Option<String> {
        let now = self.clock.now_ms();
        let removed = self.click_manager.cleanup_expired(now);
        (removed > 0).then(|| format!("Reaped {removed} expired pending click transaction(s)."))
    }

    /// Per-tick liveness sweep (spec.md §4.7).
    pub fn run_watchdog_check(&mut self) -> ServiceResult {
        let Some(config) = self.config.clone() else {
            return ServiceResultBuilder::new().warning("Configuration not loaded, ignoring message.").build();
        };

        let now = self.clock.now_ms();
        let mut builder = ServiceResultBuilder::new();
        let mut devices_to_ping: Vec<String> = Vec::new();
        let mut unhealthy: Vec<(String, String)> = Vec::new();

        for device in &config.devices {
            let name = &device.name;
            if let Some(state) = self.registry.get(name) {
                if !state.is_healthy && state.alert_sent {
                    continue;
                }
            }

            let snapshot = self.registry.get(name).cloned();
            let verdict = self.watchdog.check_device_health(name, snapshot.as_ref(), now);
            let change = self.registry.update_health_from_result(name, &verdict);
            builder = builder.state_changed(change.state_changed);

            match verdict {
                WatchdogResult::NeedsPing => devices_to_ping.push(name.clone()),
                WatchdogResult::Stale => {
                    devices_to_ping.push(name.clone());
                    unhealthy.push((name.clone(), "No response to ping.".to_owned()));
                }
                WatchdogResult::Unhealthy { reason } => {
                    unhealthy.push((name.clone(), reason));
                    self.registry.record_alert_sent(name);
                }
                WatchdogResult::Ok => {}
            }
        }

        if !devices_to_ping.is_empty() {
            let all_devices = config.devices.len();
            if devices_to_ping.len() == all_devices {
                builder = builder
                    .log("Every configured device is due for a ping; sending a single broadcast ping.".to_owned())
                    .message(OutputPort::Broadcast, self.layout.service_topic.clone(), CommandPayload::Ping);
            } else {
                for name in &devices_to_ping {
                    builder = builder.message(OutputPort::Lsh, self.lsh_in_topic(name), CommandPayload::Ping);
                }
                builder = builder.log(format!(
                    "Pinging {} device(s) individually, staggered by the adapter.",
                    devices_to_ping.len()
                ));
            }
        }

        if !unhealthy.is_empty() {
            let body = unhealthy
                .iter()
                .map(|(name, reason)| format!("- {name}: {reason}"))
                .collect::<Vec<_>>()
                .join("\n");
            builder = builder.alert(format!("Devices failing liveness checks:\n{body}"));
        }

        builder.build()
    }

    /// First phase of startup verification (spec.md §4.8): ping every
    /// configured device not yet connected.
    pub fn verify_initial_device_states(&mut self) -> ServiceResult {
        let Some(config) = self.config.clone() else {
            return ServiceResultBuilder::new().warning("Configuration not loaded, ignoring message.").build();
        };

        let mut builder = ServiceResultBuilder::new();
        for device in &config.devices {
            let connected = self.registry.get(&device.name).is_some_and(|s| s.connected);
            if !connected {
                builder = builder.message(OutputPort::Lsh, self.lsh_in_topic(&device.name), CommandPayload::Ping);
            }
        }
        builder.build()
    }

    /// Second phase of startup verification (spec.md §4.8): devices that
    /// still aren't healthy after the verification window are declared
    /// unhealthy.
    pub fn run_final_verification(&mut self, names: &[String]) -> ServiceResult {
        let mut builder = ServiceResultBuilder::new();
        let mut found_any = false;

        for name in names {
            let is_healthy = self.registry.get(name).is_some_and(|s| s.is_healthy);
            if !is_healthy {
                found_any = true;
                builder = builder.alert(format!("{name}: Did not respond to initial verification ping."));
                self.registry.update_health_from_result(
                    name,
                    &WatchdogResult::Unhealthy { reason: "Did not respond to initial verification ping.".to_owned() },
                );
            }
        }

        builder.state_changed(found_any).build()
    }

    /// Commands to issue immediately after a configuration load (spec.md
    /// §4.8 phase 1): ping every device not yet known to be connected. The
    /// adapter schedules [`Orchestrator::run_final_verification`] after
    /// `initialStateTimeout` to close out the second phase.
    pub fn get_startup_commands(&mut self) -> ServiceResult {
        self.verify_initial_device_states()
    }
}

fn parse_json(raw_payload: &str) -> Result<Value, String> {
    serde_json::from_str(raw_payload).map_err(|err| err.to_string())
}

fn join_validation_errors(errors: Vec<String>) -> String {
    if errors.is_empty() {
        "unknown validation error".to_owned()
    } else {
        errors.join("; ")
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
