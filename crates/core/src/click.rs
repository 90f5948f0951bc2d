// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Click Transaction Manager (spec.md §4.2): a two-phase-commit coordinator
//! with timeout-based garbage collection.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A button-press target: either every actuator on `name`, or a specific
/// subset (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub name: String,
    #[serde(default)]
    pub all_actuators: bool,
    #[serde(default)]
    pub actuators: Vec<String>,
}

/// The two click types a button can report (spec.md §3, §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClickType {
    #[serde(rename = "lc")]
    LongClick,
    #[serde(rename = "slc")]
    SuperLongClick,
}

impl ClickType {
    pub fn as_tag(self) -> &'static str {
        match self {
            Self::LongClick => "lc",
            Self::SuperLongClick => "slc",
        }
    }
}

/// A click awaiting its phase-2 confirmation (spec.md §3).
#[derive(Debug, Clone)]
pub struct PendingClickTransaction {
    pub actors: Vec<Actor>,
    pub other_actors: Vec<String>,
    pub created_at: u64,
}

/// Builds the transaction key `"<deviceName>.<buttonId>.<clickType>"`
/// (spec.md §3, §4.6).
pub fn transaction_key(device_name: &str, button_id: &str, click_type: ClickType) -> String {
    format!("{device_name}.{button_id}.{}", click_type.as_tag())
}

/// Pending-click map with TTL (spec.md §4.2). The core is single-threaded,
/// so `start`/`consume` for one key are never concurrent with each other —
/// no internal locking is needed (spec.md §4.2's ordering note).
#[derive(Debug, Default)]
pub struct ClickTransactionManager {
    click_timeout_ms: u64,
    pending: HashMap<String, PendingClickTransaction>,
}

impl ClickTransactionManager {
    pub fn new(click_timeout_secs: u64) -> Self {
        Self { click_timeout_ms: click_timeout_secs * 1000, pending: HashMap::new() }
    }

    /// Unconditionally overwrites any prior transaction under `key`.
    pub fn start(&mut self, key: impl Into<String>, actors: Vec<Actor>, other_actors: Vec<String>, now_ms: u64) {
        self.pending.insert(key.into(), PendingClickTransaction { actors, other_actors, created_at: now_ms });
    }

    /// Atomic lookup + delete.
    pub fn consume(&mut self, key: &str) -> Option<PendingClickTransaction> {
        self.pending.remove(key)
    }

    /// Removes every transaction older than `clickTimeout`. Returns how many
    /// were removed.
    pub fn cleanup_expired(&mut self, now_ms: u64) -> usize {
        let before = self.pending.len();
        self.pending.retain(|_, txn| now_ms.saturating_sub(txn.created_at) <= self.click_timeout_ms);
        before - self.pending.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
#[path = "click_tests.rs"]
mod tests;
