use crate::config::types::TimeframeConfig;
use chrono::{Local, NaiveTime, TimeZone, Timelike};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimeframeError {
    #[error("invalid time '{value}': expected HH:MM:SS")]
    InvalidTime { value: String },

    #[error("end time '{end}' is before start time '{start}' (overnight windows are not supported)")]
    EndBeforeStart { start: String, end: String },
}

/// Time-of-day window validated once at startup and immutable for the run.
///
/// Membership is evaluated against local wall-clock time; a timestamp that
/// cannot be converted to a valid local instant is treated as out-of-window.
#[derive(Debug, Clone, Copy)]
pub struct TimeWindow {
    enabled: bool,
    start_secs: u32,
    end_secs: u32,
}

impl TimeWindow {
    pub fn new(config: &TimeframeConfig) -> Result<Self, TimeframeError> {
        let start_secs = parse_time_of_day(&config.start)?;
        let end_secs = parse_time_of_day(&config.end)?;

        if end_secs < start_secs {
            return Err(TimeframeError::EndBeforeStart {
                start: config.start.clone(),
                end: config.end.clone(),
            });
        }

        Ok(Self {
            enabled: config.enabled,
            start_secs,
            end_secs,
        })
    }

    /// Window that admits every timestamp.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            start_secs: 0,
            end_secs: 0,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the local time-of-day of `timestamp_ms` (milliseconds since
    /// epoch) lies within `[start, end]` inclusive.
    pub fn contains(&self, timestamp_ms: i64) -> bool {
        if !self.enabled {
            return true;
        }

        let Some(local) = Local.timestamp_millis_opt(timestamp_ms).single() else {
            return false;
        };

        let secs = local.time().num_seconds_from_midnight();
        secs >= self.start_secs && secs <= self.end_secs
    }
}

fn parse_time_of_day(value: &str) -> Result<u32, TimeframeError> {
    // NaiveTime accepts leap seconds and fractional suffixes under other
    // formats; %H:%M:%S with an exact-length check keeps this strict.
    if value.len() != 8 {
        return Err(TimeframeError::InvalidTime {
            value: value.to_string(),
        });
    }

    let time = NaiveTime::parse_from_str(value, "%H:%M:%S").map_err(|_| {
        TimeframeError::InvalidTime {
            value: value.to_string(),
        }
    })?;

    Ok(time.num_seconds_from_midnight())
}
