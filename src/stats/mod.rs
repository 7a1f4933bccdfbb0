//! Process-wide run statistics: created at run start, appended to by the
//! update builder, rendered once as a summary at stream end.

use crate::decode::{DecodedMessage, SourceKey};
use chrono::{TimeZone, Utc};
use std::collections::BTreeMap;
use std::fmt::Write;

#[derive(Debug, Clone, Default)]
pub struct RunStatistics {
    pub total_published: u64,
    pub per_message: BTreeMap<SourceKey, MessageStats>,
    pub per_source: BTreeMap<u8, SourceStats>,
    pub first_timestamp_ms: Option<i64>,
    pub last_timestamp_ms: Option<i64>,
    pub skips: SkipCounters,
}

#[derive(Debug, Clone, Default)]
pub struct MessageStats {
    pub count: u64,
    pub description: &'static str,
}

#[derive(Debug, Clone, Default)]
pub struct SourceStats {
    pub count: u64,
    pub by_pgn: BTreeMap<u32, u64>,
}

/// Per-category counters for everything the replay dropped. Surfaced in the
/// report so data-quality problems aren't hidden in debug logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipCounters {
    pub normalize_misses: u64,
    pub window_drops: u64,
    pub decode_failures: u64,
    pub mapping_misses: u64,
}

impl RunStatistics {
    pub fn record_published(&mut self, message: &DecodedMessage, timestamp_ms: i64) {
        self.total_published += 1;

        let per_message = self.per_message.entry(message.key()).or_default();
        per_message.count += 1;
        per_message.description = message.description;

        let per_source = self.per_source.entry(message.src).or_default();
        per_source.count += 1;
        *per_source.by_pgn.entry(message.pgn).or_default() += 1;

        if self.first_timestamp_ms.is_none() {
            self.first_timestamp_ms = Some(timestamp_ms);
        }
        self.last_timestamp_ms = Some(timestamp_ms);
    }

    /// Fold in the skip counters kept by the read/decode loop. Mapping
    /// misses are counted by the update builder and already present here.
    pub fn merge_skips(&mut self, other: SkipCounters) {
        self.skips.normalize_misses += other.normalize_misses;
        self.skips.window_drops += other.window_drops;
        self.skips.decode_failures += other.decode_failures;
        self.skips.mapping_misses += other.mapping_misses;
    }

    pub fn render(&self) -> String {
        let mut out = String::new();

        writeln!(out, "replay summary").unwrap();
        writeln!(out, "  published updates: {}", self.total_published).unwrap();

        match (self.first_timestamp_ms, self.last_timestamp_ms) {
            (Some(first), Some(last)) => {
                writeln!(
                    out,
                    "  timespan: {} .. {} ({:.1}s)",
                    format_instant(first),
                    format_instant(last),
                    (last - first) as f64 / 1000.0
                )
                .unwrap();
            }
            _ => {
                writeln!(out, "  timespan: n/a").unwrap();
            }
        }

        if !self.per_message.is_empty() {
            writeln!(out, "  per message type:").unwrap();
            for (key, stats) in &self.per_message {
                writeln!(
                    out,
                    "    PGN {} src {}: {} ({})",
                    key.pgn, key.src, stats.count, stats.description
                )
                .unwrap();
            }
        }

        if !self.per_source.is_empty() {
            writeln!(out, "  per source address:").unwrap();
            for (src, stats) in &self.per_source {
                writeln!(out, "    src {}: {} updates", src, stats.count).unwrap();
                for (pgn, count) in &stats.by_pgn {
                    writeln!(out, "      PGN {}: {}", pgn, count).unwrap();
                }
            }
        }

        writeln!(out, "  skipped:").unwrap();
        writeln!(out, "    normalization misses: {}", self.skips.normalize_misses).unwrap();
        writeln!(out, "    out-of-window: {}", self.skips.window_drops).unwrap();
        writeln!(out, "    decode failures: {}", self.skips.decode_failures).unwrap();
        write!(out, "    mapping misses: {}", self.skips.mapping_misses).unwrap();

        out
    }
}

fn format_instant(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
        .unwrap_or_else(|| format!("{}ms", timestamp_ms))
}
