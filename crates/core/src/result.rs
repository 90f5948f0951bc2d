// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service result plumbing (spec.md §2, §6, §7; ambient — spec.md treats
//! `ServiceResult` as given). Every public entry point on
//! [`crate::orchestrator::Orchestrator`] returns one of these instead of
//! throwing, per the §7 policy that errors never cross the core boundary.

use crate::error::ServiceError;
use crate::payload::{CommandPayload, OtherActorsPayload};

/// Logical output port an [`OutboundMessage`] is addressed to (spec.md §2,
/// §4.6, §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPort {
    /// Per-device or broadcast LSH command traffic.
    Lsh,
    /// The configured broadcast/service topic (all-device batch ping).
    Broadcast,
    /// Human-readable alert text.
    Alerts,
    /// The synthetic fan-out to non-LSH external actors (§4.6).
    OtherActors,
}

/// An outbound payload: either a wire-tagged LSH command, or the synthetic
/// fan-out record for non-LSH external actors (spec.md §4.6) which carries
/// no `p` discriminator of its own.
#[derive(Debug, Clone)]
pub enum Payload {
    Command(CommandPayload),
    OtherActors(OtherActorsPayload),
}

impl From<CommandPayload> for Payload {
    fn from(command: CommandPayload) -> Self {
        Self::Command(command)
    }
}

impl From<OtherActorsPayload> for Payload {
    fn from(payload: OtherActorsPayload) -> Self {
        Self::OtherActors(payload)
    }
}

/// One addressed outbound message.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub port: OutputPort,
    pub topic: String,
    pub payload: Payload,
}

impl OutboundMessage {
    pub fn new(port: OutputPort, topic: impl Into<String>, payload: impl Into<Payload>) -> Self {
        Self { port, topic: topic.into(), payload: payload.into() }
    }
}

/// The structured batch every core entry point returns (spec.md §2).
#[derive(Debug, Clone, Default)]
pub struct ServiceResult {
    pub lsh: Vec<OutboundMessage>,
    pub alerts: Vec<String>,
    pub logs: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<ServiceError>,
    pub state_changed: bool,
}

impl ServiceResult {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Folds `other` into `self` in place, preserving relative ordering
    /// within each field (spec.md §5's per-port ordering guarantee).
    pub fn merge(&mut self, other: ServiceResult) {
        self.lsh.extend(other.lsh);
        self.alerts.extend(other.alerts);
        self.logs.extend(other.logs);
        self.warnings.extend(other.warnings);
        self.errors.extend(other.errors);
        self.state_changed |= other.state_changed;
    }
}

/// Accumulator used by handlers to build a [`ServiceResult`] without
/// repeating field-by-field construction at every call site (mirrors the
/// teacher's single-assembler habit for outbound construction).
#[derive(Debug, Default)]
pub struct ServiceResultBuilder {
    result: ServiceResult,
}

impl ServiceResultBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(mut self, port: OutputPort, topic: impl Into<String>, payload: impl Into<Payload>) -> Self {
        self.result.lsh.push(OutboundMessage::new(port, topic, payload));
        self
    }

    pub fn alert(mut self, text: impl Into<String>) -> Self {
        self.result.alerts.push(text.into());
        self
    }

    pub fn log(mut self, text: impl Into<String>) -> Self {
        self.result.logs.push(text.into());
        self
    }

    pub fn warning(mut self, text: impl Into<String>) -> Self {
        self.result.warnings.push(text.into());
        self
    }

    pub fn error(mut self, error: ServiceError) -> Self {
        self.result.errors.push(error);
        self
    }

    pub fn state_changed(mut self, changed: bool) -> Self {
        self.result.state_changed |= changed;
        self
    }

    pub fn merge(mut self, other: ServiceResult) -> Self {
        self.result.merge(other);
        self
    }

    pub fn build(self) -> ServiceResult {
        self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_in_call_order() {
        let result = ServiceResultBuilder::new()
            .log("first")
            .log("second")
            .warning("careful")
            .state_changed(true)
            .build();
        assert_eq!(result.logs, vec!["first", "second"]);
        assert_eq!(result.warnings, vec!["careful"]);
        assert!(result.state_changed);
    }

    #[test]
    fn merge_preserves_order_and_ors_state_changed() {
        let mut a = ServiceResultBuilder::new().log("a").state_changed(false).build();
        let b = ServiceResultBuilder::new().log("b").state_changed(true).build();
        a.merge(b);
        assert_eq!(a.logs, vec!["a", "b"]);
        assert!(a.state_changed);
    }
}
