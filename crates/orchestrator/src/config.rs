// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// LSH fleet orchestrator adapter: MQTT transport, config loading and
/// hot-reload, Home Assistant discovery, and the event loop around
/// `lsh-core`.
#[derive(Debug, Parser)]
#[command(name = "lsh-orchestrator", version, about)]
pub struct Config {
    /// MQTT broker hostname.
    #[arg(long, env = "LSH_MQTT_HOST", default_value = "127.0.0.1")]
    pub mqtt_host: String,

    /// MQTT broker port.
    #[arg(long, env = "LSH_MQTT_PORT", default_value_t = 1883)]
    pub mqtt_port: u16,

    /// MQTT client ID.
    #[arg(long, env = "LSH_MQTT_CLIENT_ID", default_value = "lsh-orchestrator")]
    pub mqtt_client_id: String,

    /// MQTT username, if the broker requires authentication.
    #[arg(long, env = "LSH_MQTT_USERNAME")]
    pub mqtt_username: Option<String>,

    /// MQTT password, if the broker requires authentication.
    #[arg(long, env = "LSH_MQTT_PASSWORD")]
    pub mqtt_password: Option<String>,

    /// MQTT keep-alive interval in seconds.
    #[arg(long, env = "LSH_MQTT_KEEP_ALIVE_SECS", default_value_t = 30)]
    pub mqtt_keep_alive_secs: u64,

    /// Homie topic base (devices publish `<homieBase><device>/$state`).
    #[arg(long, env = "LSH_HOMIE_BASE", default_value = "homie/")]
    pub homie_base: String,

    /// LSH topic base (devices publish/subscribe under `<lshBase><device>/…`).
    #[arg(long, env = "LSH_LSH_BASE", default_value = "lsh/")]
    pub lsh_base: String,

    /// Broadcast/service topic used for all-device batch pings.
    #[arg(long, env = "LSH_SERVICE_TOPIC", default_value = "lsh/service/broadcast")]
    pub service_topic: String,

    /// Topic the adapter publishes the `OtherActors` fan-out message to.
    #[arg(long, env = "LSH_OTHER_ACTORS_TOPIC", default_value = "lsh/service/other-actors")]
    pub other_actors_topic: String,

    /// Key prefix used when looking up external-actor state
    /// (`<prefix>.<name>.state`).
    #[arg(long, env = "LSH_OTHER_DEVICES_PREFIX", default_value = "ext")]
    pub other_devices_prefix: String,

    /// Path to the device/button configuration JSON file.
    #[arg(long, env = "LSH_CONFIG_PATH")]
    pub config_path: PathBuf,

    /// Watch `config_path` for changes and hot-reload.
    #[arg(long, env = "LSH_CONFIG_HOT_RELOAD", default_value_t = true)]
    pub config_hot_reload: bool,

    /// Seconds a pending click transaction survives before garbage collection.
    #[arg(long, env = "LSH_CLICK_TIMEOUT_SECS", default_value_t = 30)]
    pub click_timeout_secs: u64,

    /// Seconds of device silence before the watchdog pings it.
    #[arg(long, env = "LSH_INTERROGATE_THRESHOLD_SECS", default_value_t = 60)]
    pub interrogate_threshold_secs: u64,

    /// Seconds to wait for a ping response before declaring a device stale.
    #[arg(long, env = "LSH_PING_TIMEOUT_SECS", default_value_t = 30)]
    pub ping_timeout_secs: u64,

    /// Seconds between pending-click-transaction GC sweeps.
    #[arg(long, env = "LSH_CLICK_CLEANUP_INTERVAL_SECS", default_value_t = 10)]
    pub click_cleanup_interval_secs: u64,

    /// Seconds between watchdog liveness sweeps.
    #[arg(long, env = "LSH_WATCHDOG_INTERVAL_SECS", default_value_t = 15)]
    pub watchdog_interval_secs: u64,

    /// Seconds to wait after startup before declaring unresponsive devices
    /// unhealthy.
    #[arg(long, env = "LSH_INITIAL_STATE_TIMEOUT_SECS", default_value_t = 20)]
    pub initial_state_timeout_secs: u64,

    /// Home Assistant MQTT-discovery topic prefix. Unset disables discovery.
    #[arg(long, env = "LSH_HA_DISCOVERY_PREFIX")]
    pub ha_discovery_prefix: Option<String>,

    /// Log format (json or text).
    #[arg(long, env = "LSH_LOG_FORMAT", default_value = "json")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LSH_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.mqtt_host.is_empty() {
            anyhow::bail!("--mqtt-host must not be empty");
        }
        if !self.homie_base.ends_with('/') || !self.lsh_base.ends_with('/') {
            anyhow::bail!("--homie-base and --lsh-base must end with '/'");
        }
        Ok(())
    }

    pub fn mqtt_keep_alive(&self) -> Duration {
        Duration::from_secs(self.mqtt_keep_alive_secs)
    }

    pub fn click_cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.click_cleanup_interval_secs)
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_secs(self.watchdog_interval_secs)
    }

    pub fn initial_state_timeout(&self) -> Duration {
        Duration::from_secs(self.initial_state_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bases_without_trailing_slash() {
        let config = Config {
            mqtt_host: "localhost".into(),
            mqtt_port: 1883,
            mqtt_client_id: "id".into(),
            mqtt_username: None,
            mqtt_password: None,
            mqtt_keep_alive_secs: 30,
            homie_base: "homie".into(),
            lsh_base: "lsh/".into(),
            service_topic: "lsh/service/broadcast".into(),
            other_actors_topic: "lsh/service/other-actors".into(),
            other_devices_prefix: "ext".into(),
            config_path: PathBuf::from("/tmp/config.json"),
            config_hot_reload: true,
            click_timeout_secs: 30,
            interrogate_threshold_secs: 60,
            ping_timeout_secs: 30,
            click_cleanup_interval_secs: 10,
            watchdog_interval_secs: 15,
            initial_state_timeout_secs: 20,
            ha_discovery_prefix: None,
            log_format: "json".into(),
            log_level: "info".into(),
        };
        assert!(config.validate().is_err());
    }
}
