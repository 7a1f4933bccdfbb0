use crate::batch::BatchOffer;
use crate::bus::{CanFrame, FrameSink};
use crate::config::types::PlaybackConfig;
use crate::decode::DecodedMessage;
use crate::timeframe::TimeWindow;
use chrono::Utc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::warn;

/// Outcome of offering one decoded message to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emit {
    /// Handed to the aggregator (after any pacing delay).
    Sent,
    /// Rejected by the time-of-day window; no state changed.
    OutOfWindow,
    /// Shutdown requested or the downstream channel closed.
    Stopped,
}

/// Serial ordering/timing core of the replay.
///
/// Decides the effective timestamp for each emission and how long to wait
/// before it, without ever reordering messages. `last_timestamp` always
/// tracks the *source* timestamps so pacing follows original log timing even
/// when output timestamps are overridden.
pub struct PlaybackScheduler {
    realtime: bool,
    original_timestamps: bool,
    window: TimeWindow,
    last_timestamp_ms: Option<i64>,
    first_timestamp_ms: Option<i64>,
    offers: mpsc::Sender<BatchOffer>,
    frame_sink: Option<Box<dyn FrameSink>>,
    shutdown: watch::Receiver<bool>,
}

impl PlaybackScheduler {
    pub fn new(
        playback: &PlaybackConfig,
        window: TimeWindow,
        offers: mpsc::Sender<BatchOffer>,
        frame_sink: Option<Box<dyn FrameSink>>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            realtime: playback.realtime,
            original_timestamps: playback.original_timestamps,
            window,
            last_timestamp_ms: None,
            first_timestamp_ms: None,
            offers,
            frame_sink,
            shutdown,
        }
    }

    /// Schedule one message for emission, in log order. This is the only
    /// suspension point in the serial pipeline: pacing sleeps here while
    /// batch timers keep firing on their own task.
    pub async fn offer(&mut self, message: DecodedMessage, source_ts_ms: Option<i64>) -> Emit {
        // Records without a source timestamp are judged by wall-clock replay
        // time; the window is a best-effort filter either way.
        let candidate = source_ts_ms.unwrap_or_else(now_ms);
        if !self.window.contains(candidate) {
            return Emit::OutOfWindow;
        }

        let effective_ts_ms = match (self.original_timestamps, source_ts_ms) {
            (true, Some(ts)) => ts,
            _ => now_ms(),
        };

        if self.realtime {
            if let (Some(last), Some(ts)) = (self.last_timestamp_ms, source_ts_ms) {
                let wait = ts - last;
                // Clock regressions and duplicate timestamps emit immediately
                if wait > 0 {
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_millis(wait as u64)) => {}
                        _ = self.shutdown.changed() => return Emit::Stopped,
                    }
                }
            }
        }
        if *self.shutdown.borrow() {
            return Emit::Stopped;
        }

        if let Some(bus) = &mut self.frame_sink {
            if let Err(e) = bus.send(&CanFrame::from_message(&message)) {
                warn!(pgn = message.pgn, src = message.src, error = %e, "bus send failed");
            }
        }

        let offer = BatchOffer {
            key: message.key(),
            timestamp_ms: effective_ts_ms,
            message,
        };
        if self.offers.send(offer).await.is_err() {
            return Emit::Stopped;
        }

        if let Some(ts) = source_ts_ms {
            if self.first_timestamp_ms.is_none() {
                self.first_timestamp_ms = Some(ts);
            }
            self.last_timestamp_ms = Some(ts);
        }

        Emit::Sent
    }

    pub fn last_timestamp_ms(&self) -> Option<i64> {
        self.last_timestamp_ms
    }

    pub fn first_timestamp_ms(&self) -> Option<i64> {
        self.first_timestamp_ms
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
