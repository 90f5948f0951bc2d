// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use lsh_core::{Clock, ContextReader, FakeClock, InMemoryContext, Orchestrator, OrchestratorTimings, TopicLayout, Validators};

pub const HOMIE_BASE: &str = "homie/";
pub const LSH_BASE: &str = "lsh/";
pub const SERVICE_TOPIC: &str = "lsh/service/broadcast";
pub const OTHER_ACTORS_TOPIC: &str = "lsh/service/other-actors";
pub const OTHER_DEVICES_PREFIX: &str = "ext";

pub fn layout() -> TopicLayout {
    TopicLayout {
        homie_base: HOMIE_BASE.to_owned(),
        lsh_base: LSH_BASE.to_owned(),
        service_topic: SERVICE_TOPIC.to_owned(),
        other_actors_topic: OTHER_ACTORS_TOPIC.to_owned(),
        other_devices_prefix: OTHER_DEVICES_PREFIX.to_owned(),
    }
}

pub fn timings() -> OrchestratorTimings {
    OrchestratorTimings { click_timeout_secs: 30, interrogate_threshold_secs: 60, ping_timeout_secs: 30 }
}

/// Builds an `Orchestrator` with a fake clock (returned alongside so tests
/// can advance it) and an in-memory context reader.
pub fn build() -> (Orchestrator, FakeClock) {
    let clock = FakeClock::new(1_000);
    let clock_dyn: Arc<dyn Clock> = Arc::new(clock.clone());
    let context: Arc<dyn ContextReader> = Arc::new(InMemoryContext::new());
    let orchestrator = Orchestrator::new(layout(), timings(), clock_dyn, context, Validators::default())
        .expect("valid topic layout");
    (orchestrator, clock)
}

pub fn homie_topic(device: &str) -> String {
    format!("{HOMIE_BASE}{device}/$state")
}

pub fn conf_topic(device: &str) -> String {
    format!("{LSH_BASE}{device}/conf")
}

pub fn state_topic(device: &str) -> String {
    format!("{LSH_BASE}{device}/state")
}

pub fn misc_topic(device: &str) -> String {
    format!("{LSH_BASE}{device}/misc")
}

pub fn in_topic(device: &str) -> String {
    format!("{LSH_BASE}{device}/IN")
}
