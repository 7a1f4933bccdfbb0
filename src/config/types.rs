use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub input: InputConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub timeframe: TimeframeConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Reproduce the original inter-message timing from the log.
    #[serde(default = "default_true")]
    pub realtime: bool,
    /// Stamp emitted updates with the log's timestamps instead of now().
    #[serde(default = "default_true")]
    pub original_timestamps: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            realtime: true,
            original_timestamps: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeframeConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_timeframe_start")]
    pub start: String,
    #[serde(default = "default_timeframe_end")]
    pub end: String,
}

impl Default for TimeframeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            start: default_timeframe_start(),
            end: default_timeframe_end(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Quiescence window: a source's queued updates are published once no
    /// new frame for that source has arrived for this long.
    #[serde(with = "humantime_serde", default = "default_quiescence")]
    pub quiescence: Duration,
    #[serde(default = "default_buffer_limit")]
    pub buffer_limit: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            quiescence: default_quiescence(),
            buffer_limit: default_buffer_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_bus_interface")]
    pub interface: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interface: default_bus_interface(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_true() -> bool {
    true
}

fn default_timeframe_start() -> String {
    "00:00:00".to_string()
}

fn default_timeframe_end() -> String {
    "23:59:59".to_string()
}

fn default_quiescence() -> Duration {
    Duration::from_millis(100)
}

fn default_buffer_limit() -> usize {
    1000
}

fn default_bus_interface() -> String {
    "vcan0".to_string()
}
