// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Core-facing system configuration (spec.md §3, §4.5, §6): button-action
//! wiring per device. Loading is the adapter's job (`orchestrator::file_config`);
//! this module only holds the parsed shape and the registry-prune semantics
//! a reload triggers.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::click::Actor;

/// A single configured button action (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ButtonAction {
    pub id: String,
    #[serde(default)]
    pub actors: Vec<Actor>,
    #[serde(default)]
    pub other_actors: Vec<String>,
}

/// Per-device button configuration (spec.md §3).
///
/// Both button arrays default to empty when absent — resolving the Open
/// Question in spec.md §9 about required-vs-optional button arrays in
/// favor of "only `name` is required at the schema level" (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub name: String,
    #[serde(default)]
    pub long_click_buttons: Vec<ButtonAction>,
    #[serde(default)]
    pub super_long_click_buttons: Vec<ButtonAction>,
}

/// Root system configuration (spec.md §3, §6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

impl SystemConfig {
    pub fn device(&self, name: &str) -> Option<&DeviceConfig> {
        self.devices.iter().find(|d| d.name == name)
    }

    pub fn device_names(&self) -> HashSet<String> {
        self.devices.iter().map(|d| d.name.clone()).collect()
    }
}

impl DeviceConfig {
    /// Finds the configured button action for a given button id and click
    /// type (spec.md §4.6 phase 1, step 1).
    pub fn button_action(&self, button_id: &str, click_type: crate::click::ClickType) -> Option<&ButtonAction> {
        let list = match click_type {
            crate::click::ClickType::LongClick => &self.long_click_buttons,
            crate::click::ClickType::SuperLongClick => &self.super_long_click_buttons,
        };
        list.iter().find(|b| b.id == button_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_arrays_default_to_empty_when_absent() {
        let json = r#"{"devices":[{"name":"dev-A"}]}"#;
        let cfg: SystemConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.devices.len(), 1);
        assert!(cfg.devices[0].long_click_buttons.is_empty());
        assert!(cfg.devices[0].super_long_click_buttons.is_empty());
    }

    #[test]
    fn device_names_collects_all_names() {
        let cfg = SystemConfig {
            devices: vec![
                DeviceConfig { name: "a".into(), long_click_buttons: vec![], super_long_click_buttons: vec![] },
                DeviceConfig { name: "b".into(), long_click_buttons: vec![], super_long_click_buttons: vec![] },
            ],
        };
        let names = cfg.device_names();
        assert!(names.contains("a"));
        assert!(names.contains("b"));
    }

    #[test]
    fn button_action_looks_up_by_click_type() {
        let cfg = DeviceConfig {
            name: "dev".into(),
            long_click_buttons: vec![ButtonAction {
                id: "B1".into(),
                actors: vec![],
                other_actors: vec![],
            }],
            super_long_click_buttons: vec![],
        };
        assert!(cfg.button_action("B1", crate::click::ClickType::LongClick).is_some());
        assert!(cfg.button_action("B1", crate::click::ClickType::SuperLongClick).is_none());
    }
}
