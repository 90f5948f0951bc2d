// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire payload types (spec.md §6): every inbound/outbound shape named in
//! the grammar, made concrete as typed, serde-derived structs/enums per the
//! "duck-typed payloads" design note in spec.md §9.

use serde::{Deserialize, Serialize};

use crate::click::ClickType;

/// Homie `$state` payload values (spec.md §6). `ready` is the only
/// "connected" value; anything unrecognized still routes through as a
/// disconnect-equivalent string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HomieState {
    Ready,
    Init,
    Lost,
    Alert,
    Other(String),
}

impl HomieState {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "ready" => Self::Ready,
            "init" => Self::Init,
            "lost" => Self::Lost,
            "alert" => Self::Alert,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Ready => "ready",
            Self::Init => "init",
            Self::Lost => "lost",
            Self::Alert => "alert",
            Self::Other(s) => s,
        }
    }
}

/// `<lshBase><device>/conf` — device details announcement (`d_dd`).
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfPayload {
    #[allow(dead_code)]
    pub p: String,
    #[serde(default, rename = "ai")]
    pub actuators_ids: Vec<String>,
    #[serde(default, rename = "bi")]
    pub buttons_ids: Vec<String>,
    #[serde(default, rename = "dn")]
    pub device_name: Option<String>,
}

/// `<lshBase><device>/state` — actuator states (`d_as`).
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceStatePayload {
    #[allow(dead_code)]
    pub p: String,
    #[serde(rename = "as")]
    pub actuator_states: Vec<bool>,
}

/// `<lshBase><device>/misc` discriminated payload, keyed on `p`
/// (spec.md §4.5, §6).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "p")]
pub enum MiscPayload {
    #[serde(rename = "c_nc")]
    NetworkClick {
        #[serde(rename = "bi")]
        button_id: String,
        #[serde(rename = "ct")]
        click_type: ClickType,
        c: bool,
    },
    #[serde(rename = "d_b")]
    Boot,
    #[serde(rename = "d_p")]
    Ping,
}

/// Outbound command payloads (spec.md §6's table). Serializes with the
/// wire tag embedded as `p`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "p")]
pub enum CommandPayload {
    #[serde(rename = "d_nca")]
    NetworkClickAck {
        #[serde(rename = "ct")]
        click_type: ClickType,
        #[serde(rename = "bi")]
        button_id: String,
    },
    #[serde(rename = "c_f")]
    ClickFailover {
        #[serde(rename = "ct")]
        click_type: ClickType,
        #[serde(rename = "bi")]
        button_id: String,
    },
    #[serde(rename = "c_gf")]
    GeneralFailover,
    #[serde(rename = "c_aas")]
    ApplyAllActuatorsState {
        #[serde(rename = "as")]
        states: Vec<bool>,
    },
    #[serde(rename = "c_asas")]
    ApplySingleActuatorState {
        #[serde(rename = "ai")]
        actuator_id: String,
        #[serde(rename = "as")]
        state: bool,
    },
    #[serde(rename = "d_p")]
    Ping,
    /// Request the device to resend its `conf` announcement. The exact
    /// outbound tag is implementation-chosen (spec.md §9's open question);
    /// fixed here as `d_sdd`.
    #[serde(rename = "d_sdd")]
    SendDeviceDetails,
    /// Request the device to resend its `state` announcement. Fixed as
    /// `d_sas` alongside `d_sdd`.
    #[serde(rename = "d_sas")]
    SendActuatorsState,
}

/// Payload for the synthetic `OtherActors` fan-out message (spec.md §4.6).
#[derive(Debug, Clone, Serialize)]
pub struct OtherActorsPayload {
    pub other_actors: Vec<String>,
    pub state_to_set: bool,
    pub payload: String,
}
