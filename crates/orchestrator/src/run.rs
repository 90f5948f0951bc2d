// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event loop (spec.md §1 peripheral wiring; SPEC_FULL `orchestrator::run`).
//! Connects MQTT, loads configuration, runs the two-phase startup
//! verification, then drives `lsh-core::Orchestrator` from inbound MQTT
//! messages, watchdog/click-cleanup timers, and config-file-change
//! notifications. A single task owns the `Orchestrator` directly, which
//! trivially satisfies spec.md §5's single-writer requirement without a
//! mutex (the adapter never calls into the core from more than one place).

use std::sync::Arc;
use std::time::Duration;

use lsh_core::payload::CommandPayload;
use lsh_core::{Clock, ContextReader, Orchestrator, OrchestratorTimings, OutputPort, Payload, ServiceResult, SystemClock, TopicLayout, Validators};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::context_mirror::MirroredContext;
use crate::file_config;
use crate::ha_discovery;
use crate::mqtt::{Inbound, MqttTransport};

/// Initializes tracing from `config.log_format`/`config.log_level`,
/// mirroring the teacher's `init_tracing` (`crates/cli/src/run.rs`):
/// `--log-level`/env override, `json` or plain-text formatter, `try_init`
/// so repeated calls (tests) don't panic.
pub fn init_tracing(config: &Config) {
    use tracing_subscriber::fmt;

    let filter = if std::env::var("LSH_LOG_LEVEL").is_err() && config.log_level == "info" {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
    } else {
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let result = match config.log_format.as_str() {
        "json" => fmt::fmt().with_env_filter(filter).json().try_init(),
        _ => fmt::fmt().with_env_filter(filter).try_init(),
    };
    drop(result);
}

fn topic_layout(config: &Config) -> TopicLayout {
    TopicLayout {
        homie_base: config.homie_base.clone(),
        lsh_base: config.lsh_base.clone(),
        service_topic: config.service_topic.clone(),
        other_actors_topic: config.other_actors_topic.clone(),
        other_devices_prefix: config.other_devices_prefix.clone(),
    }
}

fn timings(config: &Config) -> OrchestratorTimings {
    OrchestratorTimings {
        click_timeout_secs: config.click_timeout_secs,
        interrogate_threshold_secs: config.interrogate_threshold_secs,
        ping_timeout_secs: config.ping_timeout_secs,
    }
}

fn payload_to_json(payload: &Payload) -> serde_json::Result<String> {
    match payload {
        Payload::Command(command) => serde_json::to_string(command),
        Payload::OtherActors(other) => serde_json::to_string(other),
    }
}

/// Fans a `ServiceResult` out to MQTT and `tracing`: logs to `info!`,
/// warnings to `warn!`, errors to `error!`, alerts to `warn!` on a
/// dedicated target, and outbound messages to their addressed topics
/// (spec.md §2, §4.7's randomized-stagger ping batch).
async fn dispatch_result(transport: &MqttTransport, result: ServiceResult) {
    for log in &result.logs {
        info!("{log}");
    }
    for warning in &result.warnings {
        warn!("{warning}");
    }
    for err in &result.errors {
        error!("{err}");
    }
    for alert in &result.alerts {
        warn!(target: "lsh_alerts", "{alert}");
    }

    let ping_batch_size = result
        .lsh
        .iter()
        .filter(|m| m.port == OutputPort::Lsh && matches!(m.payload, Payload::Command(CommandPayload::Ping)))
        .count();

    if ping_batch_size > 1 {
        let mut staggered = Vec::new();
        for msg in &result.lsh {
            if msg.port == OutputPort::Lsh && matches!(msg.payload, Payload::Command(CommandPayload::Ping)) {
                match payload_to_json(&msg.payload) {
                    Ok(body) => staggered.push((msg.topic.clone(), body)),
                    Err(e) => error!("serializing ping command: {e}"),
                }
            } else {
                publish_message(transport, &msg.topic, &msg.payload).await;
            }
        }
        transport.publish_staggered(staggered).await;
    } else {
        for msg in &result.lsh {
            publish_message(transport, &msg.topic, &msg.payload).await;
        }
    }
}

async fn publish_message(transport: &MqttTransport, topic: &str, payload: &Payload) {
    match payload_to_json(payload) {
        Ok(body) => transport.publish(topic, &body).await,
        Err(e) => error!(topic, "serializing outbound message: {e}"),
    }
}

/// Publishes Home Assistant discovery configs for every actuator on
/// `device_name`, when `ha_discovery_prefix` is configured (spec.md §1's
/// discovery peripheral concern).
async fn publish_discovery(transport: &MqttTransport, config: &Config, device_name: &str, actuators_ids: &[String]) {
    let Some(prefix) = &config.ha_discovery_prefix else { return };
    let messages = ha_discovery::switch_discovery_messages(prefix, &config.lsh_base, device_name, actuators_ids);
    for (topic, body) in messages {
        transport.publish(&topic, &body).await;
    }
}

/// Runs the adapter until its process is killed. `lsh-orchestrator`'s
/// top-level wiring: connect MQTT, load config, verify startup, then loop.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let context: Arc<dyn ContextReader> = Arc::new(MirroredContext::new());

    let mut orchestrator =
        Orchestrator::new(topic_layout(&config), timings(&config), clock, context, Validators::default())
            .map_err(|e| anyhow::anyhow!("invalid topic configuration: {e}"))?;

    let (transport, mut inbound_rx, _mqtt_task) = MqttTransport::connect(&config);

    let initial_config = file_config::load(&config.config_path)?;
    let summary = orchestrator.update_system_config(initial_config);
    info!("{summary}");

    let startup = orchestrator.get_startup_commands();
    dispatch_result(&transport, startup).await;

    let configured_names: Vec<String> = orchestrator.get_configured_device_names().into_iter().collect();
    let verification_deadline = tokio::time::sleep(config.initial_state_timeout());
    tokio::pin!(verification_deadline);
    let mut verification_pending = true;

    let (reload_tx, mut reload_rx) = mpsc::channel::<()>(4);
    let _watcher = if config.config_hot_reload {
        crate::file_config::ConfigWatcher::new(config.config_path.clone()).watch(reload_tx)
    } else {
        None
    };

    let mut watchdog_interval = tokio::time::interval(config.watchdog_interval());
    let mut click_cleanup_interval = tokio::time::interval(config.click_cleanup_interval());

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,

            _ = tokio::signal::ctrl_c() => {
                info!("received ctrl-c, shutting down");
                shutdown.cancel();
            }

            maybe_msg = inbound_rx.recv() => {
                let Some(Inbound { topic, payload }) = maybe_msg else {
                    warn!("mqtt transport channel closed, shutting down");
                    break;
                };
                let result = orchestrator.process_message(&topic, &payload);
                if result.state_changed {
                    if let Some((device_name, actuators_ids)) = changed_conf_device(&topic, &config, &orchestrator) {
                        publish_discovery(&transport, &config, &device_name, &actuators_ids).await;
                    }
                }
                dispatch_result(&transport, result).await;
            }

            _ = watchdog_interval.tick() => {
                let result = orchestrator.run_watchdog_check();
                dispatch_result(&transport, result).await;
            }

            _ = click_cleanup_interval.tick() => {
                if let Some(line) = orchestrator.cleanup_pending_clicks() {
                    info!("{line}");
                }
            }

            _ = &mut verification_deadline, if verification_pending => {
                verification_pending = false;
                let result = orchestrator.run_final_verification(&configured_names);
                dispatch_result(&transport, result).await;
            }

            _ = reload_rx.recv() => {
                match file_config::load(&config.config_path) {
                    Ok(new_config) => {
                        let summary = orchestrator.update_system_config(new_config);
                        info!("config reloaded: {summary}");
                    }
                    Err(e) => warn!("config reload failed, keeping previous configuration: {e}"),
                }
            }
        }
    }

    Ok(())
}

/// If `topic` was a `conf` announcement that changed registry state, returns
/// the device name and its current actuator IDs so the caller can publish
/// Home Assistant discovery configs for them.
fn changed_conf_device(topic: &str, config: &Config, orchestrator: &Orchestrator) -> Option<(String, Vec<String>)> {
    let suffix = topic.strip_prefix(&config.lsh_base)?.strip_suffix("/conf")?;
    let device_name = suffix.to_owned();
    let registry = orchestrator.get_device_registry();
    let state = registry.get(&device_name)?;
    Some((device_name, state.actuators_ids.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_to_json_serializes_command_wire_tag() {
        let payload = Payload::Command(CommandPayload::Ping);
        let body = payload_to_json(&payload).unwrap();
        assert_eq!(body, r#"{"p":"d_p"}"#);
    }

    #[test]
    fn payload_to_json_serializes_other_actors() {
        let payload = Payload::OtherActors(lsh_core::payload::OtherActorsPayload {
            other_actors: vec!["ext-lamp".to_owned()],
            state_to_set: true,
            payload: "Set state=true for external actors.".to_owned(),
        });
        let body = payload_to_json(&payload).unwrap();
        assert!(body.contains("ext-lamp"));
    }
}
