// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External-actor state lookup (spec.md §4.4, §5, §9: "Context reader
//! abstraction"). Treated as read-only and side-effect-free; invoked only
//! from `DeviceRegistry::smart_toggle`.

use std::collections::HashMap;
use std::sync::RwLock;

/// Synchronous keyed read of a boolean actuator state owned by some external
/// actor (not one of this fleet's LSH devices).
pub trait ContextReader: Send + Sync {
    /// Look up `key` (e.g. `"<otherDevicesPrefix>.<name>.state"`). `None`
    /// covers both "key absent" and "value present but not a boolean" —
    /// callers distinguish the latter via [`ContextReader::read_raw`] when
    /// they need to report why a lookup didn't produce a boolean.
    fn read_bool(&self, key: &str) -> Option<bool>;

    /// Raw lookup, used only to build a diagnostic message when a key exists
    /// but isn't a boolean (spec.md §4.4's warning-accumulation behavior).
    fn read_raw(&self, key: &str) -> Option<serde_json::Value> {
        self.read_bool(key).map(|b| serde_json::Value::Bool(b))
    }
}

/// In-memory `ContextReader` for tests and for adapters that mirror state
/// into a plain map (spec.md §9's "tests supply an in-memory map").
#[derive(Debug, Default)]
pub struct InMemoryContext {
    values: RwLock<HashMap<String, serde_json::Value>>,
}

impl InMemoryContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_bool(&self, key: impl Into<String>, value: bool) {
        self.values.write().unwrap_or_else(|e| e.into_inner()).insert(key.into(), serde_json::Value::Bool(value));
    }

    /// Insert a non-boolean value, for exercising the "present but not a
    /// boolean" warning path.
    pub fn set_raw(&self, key: impl Into<String>, value: serde_json::Value) {
        self.values.write().unwrap_or_else(|e| e.into_inner()).insert(key.into(), value);
    }

    pub fn remove(&self, key: &str) {
        self.values.write().unwrap_or_else(|e| e.into_inner()).remove(key);
    }
}

impl ContextReader for InMemoryContext {
    fn read_bool(&self, key: &str) -> Option<bool> {
        match self.values.read().unwrap_or_else(|e| e.into_inner()).get(key) {
            Some(serde_json::Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    fn read_raw(&self, key: &str) -> Option<serde_json::Value> {
        self.values.read().unwrap_or_else(|e| e.into_inner()).get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_back_bool() {
        let ctx = InMemoryContext::new();
        ctx.set_bool("ext.lamp.state", true);
        assert_eq!(ctx.read_bool("ext.lamp.state"), Some(true));
        assert_eq!(ctx.read_bool("ext.missing.state"), None);
    }

    #[test]
    fn non_bool_value_is_absent_but_raw_is_visible() {
        let ctx = InMemoryContext::new();
        ctx.set_raw("ext.broken.state", serde_json::json!("not-a-bool"));
        assert_eq!(ctx.read_bool("ext.broken.state"), None);
        assert!(ctx.read_raw("ext.broken.state").is_some());
    }
}
