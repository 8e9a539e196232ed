//! Monitor configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Longest accepted forecast horizon (24 hours).
pub const MAX_FORECAST_MINUTES: u32 = 24 * 60;

/// Top-level monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Probe endpoints.
    #[serde(default)]
    pub probe: ProbeConfig,

    /// Stream payload handling.
    #[serde(default)]
    pub stream: StreamConfig,

    /// Timing parameters (seconds).
    #[serde(default)]
    pub timing: TimingConfig,

    /// Forecast defaults and the optional live inputs file.
    #[serde(default)]
    pub forecast: ForecastConfig,

    /// Persistent series storage.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Chart and label output.
    #[serde(default)]
    pub render: RenderConfig,
}

/// HTTP endpoints of the temperature probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Base URL, e.g. "http://192.168.1.40".
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path returning the current reading as JSON.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,

    /// Path prefix of the incremental stream; the `since` key is appended.
    #[serde(default = "default_stream_path")]
    pub stream_path: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// How a stream payload that does not follow the pair grammar is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeMode {
    /// Reject the payload and abort the cycle.
    #[default]
    Strict,
    /// Treat the payload as carrying zero pairs.
    Lenient,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamConfig {
    #[serde(default)]
    pub decode_mode: DecodeMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Refresh cycle interval.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Forecast horizon in minutes, at most [`MAX_FORECAST_MINUTES`].
    #[serde(default = "default_duration_minutes")]
    pub duration_minutes: u32,

    /// Temperature the completion estimate counts down to.
    #[serde(default = "default_target_temperature")]
    pub target_temperature: f64,

    /// TOML file re-read every cycle to override the two values above.
    #[serde(default)]
    pub inputs_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON file backing the key-value store.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Keep at most this many samples (oldest evicted). Unbounded when unset.
    #[serde(default)]
    pub max_samples: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Directory receiving the plot spec and label files.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Temperature unit shown in labels and the axis title.
    #[serde(default = "default_unit")]
    pub unit: String,
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_base_url() -> String {
    "http://127.0.0.1:8080".into()
}
fn default_snapshot_path() -> String {
    "/data/current".into()
}
fn default_stream_path() -> String {
    "/data/stream".into()
}
fn default_request_timeout() -> u64 {
    30
}

fn default_refresh_interval() -> u64 {
    5
}

fn default_duration_minutes() -> u32 {
    10
}
fn default_target_temperature() -> f64 {
    165.0
}

fn default_store_path() -> PathBuf {
    PathBuf::from("thermowatch-store.json")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("dashboard")
}
fn default_unit() -> String {
    "°F".into()
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            snapshot_path: default_snapshot_path(),
            stream_path: default_stream_path(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval(),
        }
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            duration_minutes: default_duration_minutes(),
            target_temperature: default_target_temperature(),
            inputs_file: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            max_samples: None,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            unit: default_unit(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            probe: ProbeConfig::default(),
            stream: StreamConfig::default(),
            timing: TimingConfig::default(),
            forecast: ForecastConfig::default(),
            storage: StorageConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl ForecastConfig {
    pub fn inputs(&self) -> crate::ForecastInputs {
        crate::ForecastInputs {
            forecast_duration_minutes: self.duration_minutes,
            target_temperature: self.target_temperature,
        }
    }
}
