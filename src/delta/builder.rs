use super::paths::PathHintTable;
use super::sink::DeltaSink;
use super::{DeltaMapper, PathHint, PathValue, Update};
use crate::decode::DecodedMessage;
use crate::stats::RunStatistics;
use chrono::{TimeZone, Utc};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// Turns decoded messages into publishable updates and keeps the run's
/// diagnostic counters.
///
/// Primary path: the mapper's own knowledge. Fallback: resolve explicit path
/// hints from the static table and ask the mapper again. Message types with
/// no table entry are logged once and dropped thereafter.
pub struct UpdateBuilder {
    mapper: Box<dyn DeltaMapper>,
    sink: Box<dyn DeltaSink>,
    stats: RunStatistics,
    unmapped_pgns: HashSet<u32>,
}

impl UpdateBuilder {
    pub fn new(mapper: Box<dyn DeltaMapper>, sink: Box<dyn DeltaSink>) -> Self {
        Self {
            mapper,
            sink,
            stats: RunStatistics::default(),
            unmapped_pgns: HashSet::new(),
        }
    }

    /// Build and publish one update. Returns true when an update with at
    /// least one value was handed to the sink.
    pub async fn build_and_publish(
        &mut self,
        message: &DecodedMessage,
        effective_timestamp_ms: i64,
    ) -> bool {
        let mut values = self.mapper.to_update(message, None);

        if values.is_empty() {
            let Some(entry) = PathHintTable::lookup(message.pgn) else {
                if self.unmapped_pgns.insert(message.pgn) {
                    warn!(
                        pgn = message.pgn,
                        description = message.description,
                        "no output path known for this message type, dropping it from now on"
                    );
                }
                self.stats.skips.mapping_misses += 1;
                return false;
            };

            let hints: Vec<PathHint> = entry
                .fields
                .iter()
                .filter(|hint| message.fields.contains_key(hint.field))
                .map(|hint| PathHint {
                    field: hint.field.to_string(),
                    path: entry.resolve(message, hint),
                })
                .collect();

            values = self.mapper.to_update(message, Some(&hints));
            if entry.aggregate {
                values = collapse_to_objects(values);
            }
        }

        // A decodable frame with nothing mappable is not an emission.
        if values.is_empty() {
            debug!(pgn = message.pgn, src = message.src, "update resolved to zero values");
            return false;
        }

        let timestamp = Utc
            .timestamp_millis_opt(effective_timestamp_ms)
            .single()
            .unwrap_or_else(Utc::now);

        let update = Update {
            source: format!("n2kplay.{}.{}", message.pgn, message.src),
            timestamp,
            values,
        };

        self.stats.record_published(message, effective_timestamp_ms);

        if let Err(e) = self.sink.publish(update).await {
            // One bad publish must not stop replay of the rest of the log.
            warn!(pgn = message.pgn, src = message.src, error = %e, "publish failed");
        }

        true
    }

    pub fn stats(&self) -> &RunStatistics {
        &self.stats
    }

    pub fn into_stats(self) -> RunStatistics {
        self.stats
    }
}

/// Collapse leaf paths sharing a common parent into one update entry whose
/// value is an object keyed by the leaf names. Paths without a parent pass
/// through unchanged.
fn collapse_to_objects(values: Vec<PathValue>) -> Vec<PathValue> {
    let mut objects: BTreeMap<String, serde_json::Map<String, Value>> = BTreeMap::new();
    let mut passthrough = Vec::new();

    for value in values {
        match value.path.rsplit_once('.') {
            Some((parent, leaf)) => {
                objects
                    .entry(parent.to_string())
                    .or_default()
                    .insert(leaf.to_string(), value.value);
            }
            None => passthrough.push(value),
        }
    }

    let mut collapsed: Vec<PathValue> = objects
        .into_iter()
        .map(|(path, object)| PathValue {
            path,
            value: Value::Object(object),
        })
        .collect();
    collapsed.extend(passthrough);
    collapsed
}
