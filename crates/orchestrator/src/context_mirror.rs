// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Context mirroring (spec.md §1's "context mirroring to host-provided
//! key-value stores" peripheral concern; §4.4, §9's "Context reader
//! abstraction"). A real deployment backs [`lsh_core::ContextReader`] with
//! whatever host KV store is available (Home Assistant's state machine, a
//! Redis mirror, …); this adapter ships a simple in-process mirror so
//! `smartToggle`'s `otherActors` lookups have somewhere to read from
//! without pulling in an external store dependency.

use std::collections::HashMap;
use std::sync::RwLock;

use lsh_core::ContextReader;

/// Mirrors external-actor boolean state into an in-process map, keyed the
/// same way [`lsh_core::device::DeviceRegistry::smart_toggle`] reads it:
/// `"<otherDevicesPrefix>.<name>.state"`.
#[derive(Debug, Default)]
pub struct MirroredContext {
    values: RwLock<HashMap<String, bool>>,
}

impl MirroredContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called by the event loop whenever an external source (an MQTT topic
    /// outside the LSH/Homie trees, a host-runtime push, …) reports a
    /// boolean state change for a non-LSH actor.
    pub fn update(&self, key: impl Into<String>, value: bool) {
        self.values.write().unwrap_or_else(|e| e.into_inner()).insert(key.into(), value);
    }

    pub fn remove(&self, key: &str) {
        self.values.write().unwrap_or_else(|e| e.into_inner()).remove(key);
    }
}

impl ContextReader for MirroredContext {
    fn read_bool(&self, key: &str) -> Option<bool> {
        self.values.read().unwrap_or_else(|e| e.into_inner()).get(key).copied()
    }
}
