//! Per-source debounce batching.
//!
//! Bursts of frames for the same `(PGN, source address)` stream are collapsed
//! into one published update per quiescence window. This is debounce, not
//! batching-by-count: every new arrival re-arms the group's timer, so a burst
//! that never pauses long enough emits only when input stops.

use crate::decode::{DecodedMessage, SourceKey};
use crate::delta::UpdateBuilder;
use crate::stats::RunStatistics;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::time::delay_queue::{DelayQueue, Key};
use tracing::{debug, info};

/// One scheduled emission handed to the aggregator.
#[derive(Debug)]
pub struct BatchOffer {
    pub key: SourceKey,
    pub timestamp_ms: i64,
    pub message: DecodedMessage,
}

#[derive(Default)]
struct BatchGroup {
    pending: Option<Pending>,
    queued: u64,
    /// At most one armed timer per group; arming replaces the previous one.
    timer: Option<Key>,
}

struct Pending {
    timestamp_ms: i64,
    message: DecodedMessage,
}

/// Run the batching aggregator until the offer channel closes, then flush
/// every group with pending state and return the run's statistics.
///
/// The aggregator owns all group state and the update builder; emissions for
/// a given group can never race because everything happens on this task.
pub async fn run_aggregator(
    mut rx: mpsc::Receiver<BatchOffer>,
    mut builder: UpdateBuilder,
    quiescence: Duration,
) -> RunStatistics {
    let mut groups: HashMap<SourceKey, BatchGroup> = HashMap::new();
    let mut timers: DelayQueue<SourceKey> = DelayQueue::new();

    info!(quiescence_ms = quiescence.as_millis() as u64, "batch aggregator started");

    loop {
        tokio::select! {
            offer = rx.recv() => match offer {
                Some(offer) => {
                    let group = groups.entry(offer.key).or_default();
                    group.pending = Some(Pending {
                        timestamp_ms: offer.timestamp_ms,
                        message: offer.message,
                    });
                    group.queued += 1;

                    match &group.timer {
                        Some(key) => timers.reset(key, quiescence),
                        None => group.timer = Some(timers.insert(offer.key, quiescence)),
                    }
                }
                None => break,
            },

            expired = futures::future::poll_fn(|cx| timers.poll_expired(cx)),
                if !timers.is_empty() =>
            {
                if let Some(expired) = expired {
                    let key = expired.into_inner();
                    if let Some(group) = groups.get_mut(&key) {
                        group.timer = None;
                        emit(key, group, &mut builder).await;
                    }
                }
            }
        }
    }

    // Stream ended: force one final emission for every open group so no
    // buffered data is lost, regardless of timer state.
    let mut flushed = 0usize;
    for (key, group) in groups.iter_mut() {
        if let Some(timer) = group.timer.take() {
            timers.remove(&timer);
        }
        if group.pending.is_some() {
            emit(*key, group, &mut builder).await;
            flushed += 1;
        }
    }

    info!(
        groups = groups.len(),
        flushed, "batch aggregator shutdown complete"
    );

    builder.into_stats()
}

async fn emit(key: SourceKey, group: &mut BatchGroup, builder: &mut UpdateBuilder) {
    let Some(pending) = group.pending.take() else {
        return;
    };
    let queued = std::mem::take(&mut group.queued);

    let published = builder
        .build_and_publish(&pending.message, pending.timestamp_ms)
        .await;
    if published {
        debug!(key = %key, queued, "published batched update");
    }
}
