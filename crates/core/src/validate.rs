// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Payload validators (spec.md §4.5, §9): injected function pointers so the
//! core never takes a hard dependency on whatever validation library an
//! adapter prefers.

use serde_json::Value;

use crate::payload::{DeviceConfPayload, DeviceStatePayload, MiscPayload};

type ValidateFn<T> = fn(&Value) -> Result<T, Vec<String>>;

/// Validator function pointers for each payload kind the router accepts.
/// `Validators::default()` builds them on plain `serde_json` deserialization
/// plus the couple of field-level checks spec.md's grammar calls for.
#[derive(Clone, Copy)]
pub struct Validators {
    pub device_conf: ValidateFn<DeviceConfPayload>,
    pub device_state: ValidateFn<DeviceStatePayload>,
    pub misc: ValidateFn<MiscPayload>,
}

impl Default for Validators {
    fn default() -> Self {
        Self {
            device_conf: validate_device_conf,
            device_state: validate_device_state,
            misc: validate_misc,
        }
    }
}

fn describe_serde_error(err: serde_json::Error) -> Vec<String> {
    vec![err.to_string()]
}

fn validate_device_conf(value: &Value) -> Result<DeviceConfPayload, Vec<String>> {
    let payload: DeviceConfPayload =
        serde_json::from_value(value.clone()).map_err(describe_serde_error)?;
    if payload.p != "d_dd" {
        return Err(vec![format!("unexpected protocol tag '{}' for conf payload", payload.p)]);
    }
    Ok(payload)
}

fn validate_device_state(value: &Value) -> Result<DeviceStatePayload, Vec<String>> {
    let payload: DeviceStatePayload =
        serde_json::from_value(value.clone()).map_err(describe_serde_error)?;
    if payload.p != "d_as" {
        return Err(vec![format!("unexpected protocol tag '{}' for state payload", payload.p)]);
    }
    Ok(payload)
}

fn validate_misc(value: &Value) -> Result<MiscPayload, Vec<String>> {
    serde_json::from_value(value.clone()).map_err(describe_serde_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_conf_payload_passes() {
        let json = serde_json::json!({"p": "d_dd", "ai": ["A1"], "bi": ["B1"], "dn": "dev"});
        let parsed = validate_device_conf(&json).unwrap();
        assert_eq!(parsed.actuators_ids, vec!["A1"]);
    }

    #[test]
    fn conf_payload_wrong_tag_is_rejected() {
        let json = serde_json::json!({"p": "wrong"});
        assert!(validate_device_conf(&json).is_err());
    }

    #[test]
    fn state_payload_requires_array() {
        let json = serde_json::json!({"p": "d_as", "as": "not-an-array"});
        assert!(validate_device_state(&json).is_err());
    }

    #[test]
    fn misc_payload_rejects_unknown_discriminator() {
        let json = serde_json::json!({"p": "unknown"});
        assert!(validate_misc(&json).is_err());
    }
}
