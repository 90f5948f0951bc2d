// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Literal end-to-end scenarios from spec.md §8, replayed against a real
//! `Orchestrator` with a fake clock and in-memory context — no live broker.

mod support;

use lsh_core::config::{DeviceConfig, SystemConfig};
use lsh_core::payload::CommandPayload;
use lsh_core::{OutputPort, Payload};
use support::{conf_topic, homie_topic, in_topic, misc_topic, state_topic};

fn click_config(device: &str, button_id: &str, actors_json: &str, other_actors: &[&str]) -> SystemConfig {
    let other = other_actors.iter().map(|s| format!("\"{s}\"")).collect::<Vec<_>>().join(",");
    let json = format!(
        r#"{{"devices":[{{"name":"{device}","long_click_buttons":[{{"id":"{button_id}","actors":[{actors_json}],"other_actors":[{other}]}}]}}]}}"#
    );
    serde_json::from_str(&json).expect("valid config json")
}

#[test]
fn unknown_click_without_config_warns_and_emits_nothing() {
    let (mut orchestrator, _clock) = support::build();

    let result = orchestrator.process_message(
        &misc_topic("dev-A"),
        r#"{"p":"c_nc","bi":"B1","ct":"lc","c":false}"#,
    );

    assert_eq!(result.warnings, vec!["Configuration not loaded, ignoring message."]);
    assert!(result.lsh.is_empty());
}

#[test]
fn happy_path_long_click_all_actuators() {
    let (mut orchestrator, _clock) = support::build();

    let config = click_config("dev-sender", "B1", r#"{"name":"actor1","all_actuators":true,"actuators":[]}"#, &[]);
    orchestrator.update_system_config(config);

    // actor1 announces one actuator, currently off, and comes online.
    orchestrator.process_message(&homie_topic("actor1"), "ready");
    orchestrator.process_message(&conf_topic("actor1"), r#"{"p":"d_dd","ai":["A1"],"bi":[]}"#);
    orchestrator.process_message(&state_topic("actor1"), r#"{"p":"d_as","as":[false]}"#);

    let request = orchestrator.process_message(
        &misc_topic("dev-sender"),
        r#"{"p":"c_nc","bi":"B1","ct":"lc","c":false}"#,
    );
    assert_eq!(request.lsh.len(), 1);
    assert_eq!(request.lsh[0].topic, in_topic("dev-sender"));
    match &request.lsh[0].payload {
        Payload::Command(CommandPayload::NetworkClickAck { button_id, .. }) => assert_eq!(button_id, "B1"),
        other => panic!("expected ACK, got {other:?}"),
    }

    let confirm = orchestrator.process_message(
        &misc_topic("dev-sender"),
        r#"{"p":"c_nc","bi":"B1","ct":"lc","c":true}"#,
    );
    assert!(confirm.logs.iter().any(|l| l.contains("Click confirmed")));
    assert_eq!(confirm.lsh.len(), 1);
    assert_eq!(confirm.lsh[0].topic, in_topic("actor1"));
    match &confirm.lsh[0].payload {
        Payload::Command(CommandPayload::ApplyAllActuatorsState { states }) => assert_eq!(states, &vec![true]),
        other => panic!("expected ApplyAllActuatorsState, got {other:?}"),
    }
}

#[test]
fn single_actuator_targets_use_the_single_actuator_command() {
    let (mut orchestrator, _clock) = support::build();

    let config =
        click_config("dev-sender", "B1", r#"{"name":"actor1","all_actuators":false,"actuators":["A2"]}"#, &[]);
    orchestrator.update_system_config(config);

    orchestrator.process_message(&homie_topic("actor1"), "ready");
    orchestrator.process_message(&conf_topic("actor1"), r#"{"p":"d_dd","ai":["A1","A2"],"bi":[]}"#);
    orchestrator.process_message(&state_topic("actor1"), r#"{"p":"d_as","as":[false,false]}"#);

    orchestrator.process_message(&misc_topic("dev-sender"), r#"{"p":"c_nc","bi":"B1","ct":"lc","c":false}"#);
    let confirm = orchestrator.process_message(&misc_topic("dev-sender"), r#"{"p":"c_nc","bi":"B1","ct":"lc","c":true}"#);

    assert_eq!(confirm.lsh.len(), 1);
    match &confirm.lsh[0].payload {
        Payload::Command(CommandPayload::ApplySingleActuatorState { actuator_id, state }) => {
            assert_eq!(actuator_id, "A2");
            assert!(*state);
        }
        other => panic!("expected ApplySingleActuatorState, got {other:?}"),
    }
}

#[test]
fn offline_target_triggers_click_scoped_failover_and_alert() {
    let (mut orchestrator, _clock) = support::build();

    let config = click_config("dev-sender", "B1", r#"{"name":"actor1","all_actuators":true,"actuators":[]}"#, &[]);
    orchestrator.update_system_config(config);
    // actor1 never announced connectivity, so it's offline.

    let request = orchestrator.process_message(
        &misc_topic("dev-sender"),
        r#"{"p":"c_nc","bi":"B1","ct":"lc","c":false}"#,
    );

    assert_eq!(request.lsh.len(), 1);
    assert_eq!(request.lsh[0].topic, in_topic("dev-sender"));
    assert!(matches!(request.lsh[0].payload, Payload::Command(CommandPayload::ClickFailover { .. })));
    assert!(request.alerts.iter().any(|a| a.contains("Target actor(s) are offline: actor1")));
}

#[test]
fn broadcast_ping_when_every_device_is_due() {
    let (mut orchestrator, clock) = support::build();

    let config = SystemConfig {
        devices: vec![
            DeviceConfig { name: "dev-A".into(), long_click_buttons: vec![], super_long_click_buttons: vec![] },
            DeviceConfig { name: "dev-B".into(), long_click_buttons: vec![], super_long_click_buttons: vec![] },
        ],
    };
    orchestrator.update_system_config(config);

    // Both devices have been seen once, then both go silent past the
    // interrogate threshold with no ping outstanding yet.
    orchestrator.process_message(&homie_topic("dev-A"), "ready");
    orchestrator.process_message(&homie_topic("dev-B"), "ready");
    clock.advance_ms(61_000);

    let result = orchestrator.run_watchdog_check();

    assert_eq!(result.lsh.len(), 1);
    assert_eq!(result.lsh[0].port, OutputPort::Broadcast);
    assert_eq!(result.lsh[0].topic, support::SERVICE_TOPIC);
    assert!(matches!(result.lsh[0].payload, Payload::Command(CommandPayload::Ping)));
    assert!(result.logs.iter().any(|l| l.contains("single broadcast ping")));
}

#[test]
fn stale_device_gets_reping_after_pong_timeout() {
    let (mut orchestrator, clock) = support::build();

    let config = SystemConfig {
        devices: vec![
            DeviceConfig { name: "dev-A".into(), long_click_buttons: vec![], super_long_click_buttons: vec![] },
            DeviceConfig { name: "dev-B".into(), long_click_buttons: vec![], super_long_click_buttons: vec![] },
        ],
    };
    orchestrator.update_system_config(config);

    // dev-A goes silent past the threshold; dev-B is never seen at all, so
    // it's immediately declared unhealthy-and-alerted on the first sweep and
    // skipped thereafter (spec.md §4.7), leaving dev-A the only device ever
    // due for a ping — exercising the per-device (not broadcast) path.
    orchestrator.process_message(&homie_topic("dev-A"), "ready");
    clock.advance_ms(61_000);

    let first = orchestrator.run_watchdog_check();
    assert_eq!(first.lsh.len(), 1);
    assert_eq!(first.lsh[0].topic, in_topic("dev-A"));
    assert!(matches!(first.lsh[0].payload, Payload::Command(CommandPayload::Ping)));

    // dev-A's ping goes unanswered past pingTimeout, so the next tick
    // reclassifies it as stale and re-pings.
    clock.advance_ms(31_000);
    let second = orchestrator.run_watchdog_check();

    assert_eq!(second.lsh.len(), 1);
    assert_eq!(second.lsh[0].topic, in_topic("dev-A"));
    assert!(matches!(second.lsh[0].payload, Payload::Command(CommandPayload::Ping)));
    let registry = orchestrator.get_device_registry();
    assert!(registry.get("dev-A").unwrap().is_stale);
}

#[test]
fn confirmation_for_unknown_click_warns_without_crashing() {
    let (mut orchestrator, _clock) = support::build();

    let config = click_config("dev-sender", "B1", r#"{"name":"actor1","all_actuators":true,"actuators":[]}"#, &[]);
    orchestrator.update_system_config(config);

    let result = orchestrator.process_message(
        &misc_topic("dev-sender"),
        r#"{"p":"c_nc","bi":"B1","ct":"lc","c":true}"#,
    );

    assert!(result.warnings[0].contains("Received confirmation for an expired or unknown click"));
    assert!(result.lsh.is_empty());
}
