// src/settings.rs
use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::drivers::{DEFAULT_BAUD_RATE, DEFAULT_HISTORY, REFRESH_PERIOD};

const SETTINGS_FILE: &str = "uart_visualizer_settings.json";
/// Largest history the rolling buffer is allowed to allocate per channel.
pub const MAX_HISTORY: usize = 100_000;

/// User preferences remembered between runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub port: String,
    pub baud_rate: u32,
    pub dummy: bool,
    pub history_length: usize,
    pub refresh_ms: u64,
    pub last_layout: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            dummy: true,
            history_length: DEFAULT_HISTORY,
            refresh_ms: REFRESH_PERIOD.as_millis() as u64,
            last_layout: None,
        }
    }
}

impl Settings {
    pub fn store_path() -> PathBuf {
        PathBuf::from(SETTINGS_FILE)
    }

    /// Reads settings from `path`; anything missing or broken falls back to defaults.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("ignoring settings: {e:#}");
                Self::default()
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let settings: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(settings.sanitized())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))
    }

    pub fn refresh_period(&self) -> Duration {
        Duration::from_millis(self.refresh_ms)
    }

    fn sanitized(mut self) -> Self {
        let history = self.history_length.clamp(1, MAX_HISTORY);
        if history != self.history_length {
            warn!(
                "history_length {} out of range, using {history}",
                self.history_length
            );
            self.history_length = history;
        }
        self.refresh_ms = self.refresh_ms.max(10);
        if self.baud_rate == 0 {
            self.baud_rate = DEFAULT_BAUD_RATE;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("uart_visualizer_settings_{}_{name}", std::process::id()))
    }

    #[test]
    fn defaults_match_stock_setup() {
        let s = Settings::default();
        assert_eq!(s.baud_rate, 115_200);
        assert!(s.dummy);
        assert_eq!(s.history_length, 200);
        assert_eq!(s.refresh_period(), Duration::from_millis(100));
    }

    #[test]
    fn save_then_load_keeps_user_choices() {
        let path = temp_path("roundtrip.json");
        let settings = Settings {
            port: "/dev/ttyUSB0".into(),
            baud_rate: 921_600,
            dummy: false,
            last_layout: Some(PathBuf::from("layouts/imu.json")),
            ..Settings::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
        fs::remove_file(path).ok();
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let path = temp_path("partial.json");
        fs::write(&path, r#"{"port": "COM7", "history_length": 0}"#).unwrap();
        let s = Settings::load_or_default(&path);
        assert_eq!(s.port, "COM7");
        assert_eq!(s.baud_rate, 115_200);
        assert_eq!(s.history_length, 1);
        fs::remove_file(path).ok();
    }

    #[test]
    fn oversized_history_is_capped() {
        let path = temp_path("huge_history.json");
        fs::write(&path, r#"{"history_length": 18446744073709551615}"#).unwrap();
        let s = Settings::load_or_default(&path);
        assert_eq!(s.history_length, MAX_HISTORY);
        let buffer = crate::drivers::RollingBuffer::new(s.history_length);
        assert_eq!(buffer.history_len(), MAX_HISTORY);
        fs::remove_file(path).ok();
    }

    #[test]
    fn broken_file_falls_back_to_defaults() {
        let path = temp_path("broken.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load_or_default(&path), Settings::default());
        assert!(Settings::load(&path).is_err());
        fs::remove_file(path).ok();
    }
}
