//! Display configuration.
//!
//! Loaded with Figment, later layers overriding earlier ones:
//! 1. Compiled defaults
//! 2. `./order-call-display.toml`, or an explicit path
//! 3. `ORDER_CALL_*` environment variables
//!
//! All durations are in milliseconds (seconds for the recent-calls window).

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::Path;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::speech::VoiceSettings;

pub const DEFAULT_CONFIG_FILE: &str = "order-call-display.toml";

/// Rejected configuration values.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("store_id must not be empty")]
    MissingStoreId,

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f32 },
}

/// Announcement clock of the notification queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Time from the start of the first call to the start of the second.
    pub call_interval_ms: u64,
    /// Time the popup stays up after the second call starts.
    pub display_duration_ms: u64,
    /// Pause between a completed item and the next pending one.
    pub resume_delay_ms: u64,
    /// Grace period after cancelling speech before speaking again.
    pub speech_cancel_delay_ms: u64,
    /// Upper bound on a single utterance.
    pub speech_watchdog_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            call_interval_ms: 4_000,
            display_duration_ms: 3_000,
            resume_delay_ms: 1_000,
            speech_cancel_delay_ms: 200,
            speech_watchdog_ms: 10_000,
        }
    }
}

impl TimingConfig {
    pub fn call_interval(&self) -> Duration {
        Duration::from_millis(self.call_interval_ms)
    }

    pub fn display_duration(&self) -> Duration {
        Duration::from_millis(self.display_duration_ms)
    }

    pub fn resume_delay(&self) -> Duration {
        Duration::from_millis(self.resume_delay_ms)
    }

    pub fn speech_cancel_delay(&self) -> Duration {
        Duration::from_millis(self.speech_cancel_delay_ms)
    }

    pub fn speech_watchdog(&self) -> Duration {
        Duration::from_millis(self.speech_watchdog_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    pub reconnect_delay_ms: u64,
    /// Capacity of the change and lifecycle event channels.
    pub event_buffer: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: 5_000,
            event_buffer: 64,
        }
    }
}

impl RealtimeConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub enabled: bool,
    #[serde(flatten)]
    pub voice: VoiceSettings,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            voice: VoiceSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecentCallsConfig {
    pub window_secs: u64,
    pub limit: usize,
    pub refresh_interval_ms: u64,
}

impl Default for RecentCallsConfig {
    fn default() -> Self {
        Self {
            window_secs: 120,
            limit: 10,
            refresh_interval_ms: 60_000,
        }
    }
}

impl RecentCallsConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub store_id: String,
    pub timing: TimingConfig,
    pub realtime: RealtimeConfig,
    pub speech: SpeechConfig,
    pub recent_calls: RecentCallsConfig,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            store_id: String::new(),
            timing: TimingConfig::default(),
            realtime: RealtimeConfig::default(),
            speech: SpeechConfig::default(),
            recent_calls: RecentCallsConfig::default(),
        }
    }
}

impl DisplayConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store_id.trim().is_empty() {
            return Err(ConfigError::MissingStoreId);
        }

        let durations = [
            ("timing.call_interval_ms", self.timing.call_interval_ms),
            ("timing.display_duration_ms", self.timing.display_duration_ms),
            ("timing.speech_watchdog_ms", self.timing.speech_watchdog_ms),
            ("realtime.reconnect_delay_ms", self.realtime.reconnect_delay_ms),
            ("recent_calls.refresh_interval_ms", self.recent_calls.refresh_interval_ms),
        ];
        if let Some((field, _)) = durations.into_iter().find(|&(_, v)| v == 0) {
            return Err(ConfigError::ZeroValue(field));
        }
        if self.realtime.event_buffer == 0 {
            return Err(ConfigError::ZeroValue("realtime.event_buffer"));
        }
        if self.recent_calls.limit == 0 {
            return Err(ConfigError::ZeroValue("recent_calls.limit"));
        }

        let voice = &self.speech.voice;
        if !(0.0..=1.0).contains(&voice.volume) {
            return Err(ConfigError::OutOfRange { field: "speech.volume", value: voice.volume });
        }
        if !(0.1..=10.0).contains(&voice.rate) {
            return Err(ConfigError::OutOfRange { field: "speech.rate", value: voice.rate });
        }
        Ok(())
    }
}

/// Load configuration from `./order-call-display.toml` with env overrides.
pub fn load_config() -> Result<DisplayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DisplayConfig::default()))
        .merge(Toml::file(DEFAULT_CONFIG_FILE))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a specific file path with env overrides.
pub fn load_config_from_path(path: &Path) -> Result<DisplayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DisplayConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only. Used by tests.
pub fn load_config_from_str(toml_content: &str) -> Result<DisplayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DisplayConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

const SECTIONS: [&str; 4] = ["recent_calls", "timing", "realtime", "speech"];

/// Maps `ORDER_CALL_<SECTION>_<KEY>` to `<section>.<key>`.
///
/// Only the leading section is split off; keys keep their underscores.
fn env_provider() -> Env {
    Env::prefixed("ORDER_CALL_").map(|key| {
        let key = key.as_str();
        SECTIONS
            .iter()
            .find_map(|section| {
                key.strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|rest| format!("{section}.{rest}"))
            })
            .unwrap_or_else(|| key.to_string())
            .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_final_timing_policy() {
        let config = DisplayConfig::default();
        assert_eq!(config.timing.call_interval(), Duration::from_secs(4));
        assert_eq!(config.timing.display_duration(), Duration::from_secs(3));
        assert_eq!(config.timing.resume_delay(), Duration::from_secs(1));
        assert_eq!(config.realtime.reconnect_delay(), Duration::from_secs(5));
        assert_eq!(config.recent_calls.limit, 10);
    }

    #[test]
    fn test_load_from_str_overrides_defaults() {
        let config = load_config_from_str(
            r#"
            store_id = "store-1"

            [timing]
            call_interval_ms = 5000
            display_duration_ms = 4000

            [speech]
            enabled = false
            locale = "en-US"
            "#,
        )
        .unwrap();

        assert_eq!(config.store_id, "store-1");
        assert_eq!(config.timing.call_interval_ms, 5000);
        assert_eq!(config.timing.display_duration_ms, 4000);
        assert_eq!(config.timing.resume_delay_ms, 1000);
        assert!(!config.speech.enabled);
        assert_eq!(config.speech.voice.locale, "en-US");
        assert_eq!(config.speech.voice.volume, 0.8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = DisplayConfig::default();
        assert_eq!(config.validate(), Err(ConfigError::MissingStoreId));

        config.store_id = "store-1".to_string();
        config.timing.call_interval_ms = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroValue("timing.call_interval_ms")));

        config.timing.call_interval_ms = 4000;
        config.speech.voice.volume = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { field: "speech.volume", .. })
        ));
    }
}
