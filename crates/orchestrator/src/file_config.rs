// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Config file loading and hot-reload (spec.md §1's "file loading and
//! hot-reload" peripheral concern). Loads a [`SystemConfig`] from JSON at
//! startup and, when enabled, watches the file with `notify` and wakes the
//! event loop on change — mirroring the `notify`-plus-wake-channel pattern
//! the teacher uses to watch session log files
//! (`crates/cli/src/driver/log_watch.rs`).

use std::path::{Path, PathBuf};

use lsh_core::config::SystemConfig;
use tokio::sync::mpsc;

/// Reads and parses the configuration file at `path`.
pub fn load(path: &Path) -> anyhow::Result<SystemConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("reading config file {}: {e}", path.display()))?;
    let config: SystemConfig = serde_json::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("parsing config file {}: {e}", path.display()))?;
    Ok(config)
}

/// Watches `path`'s parent directory for filesystem events, sending a wake
/// signal on every notification. The returned watcher must be kept alive
/// for the duration of the watch; dropping it stops notifications.
pub struct ConfigWatcher {
    path: PathBuf,
}

impl ConfigWatcher {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Set up a `notify` watcher on the config file's parent directory.
    /// Returns `None` (hot-reload silently disabled) if the watcher can't
    /// be constructed — e.g. the parent directory is unreadable.
    pub fn watch(&self, wake_tx: mpsc::Sender<()>) -> Option<notify::RecommendedWatcher> {
        use notify::{RecursiveMode, Watcher};

        let mut watcher = notify::recommended_watcher(move |_: notify::Result<notify::Event>| {
            let _ = wake_tx.try_send(());
        })
        .ok()?;

        let watch_path = self.path.parent().unwrap_or(self.path.as_ref());
        watcher.watch(watch_path, RecursiveMode::NonRecursive).ok()?;
        Some(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_minimal_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.json");
        std::fs::write(&path, r#"{"devices":[{"name":"dev-A"}]}"#).unwrap();

        let config = load(&path).unwrap();
        assert_eq!(config.devices.len(), 1);
        assert_eq!(config.devices[0].name, "dev-A");
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        assert!(load(&path).is_err());
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(load(&path).is_err());
    }
}
