pub mod builder;
pub mod paths;
pub mod sink;

use crate::decode::DecodedMessage;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub use builder::UpdateBuilder;
pub use paths::{PathHintTable, PathTemplate};
pub use sink::{DeltaSink, MemorySink, SinkError, StdoutDeltaSink};

/// One observed signal change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathValue {
    pub path: String,
    pub value: serde_json::Value,
}

/// A publishable delta: a timestamped set of path/value pairs with a source
/// label embedding the message type id and source address.
#[derive(Debug, Clone, Serialize)]
pub struct Update {
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub values: Vec<PathValue>,
}

/// A resolved path hint handed back to the mapper on the fallback pass.
#[derive(Debug, Clone)]
pub struct PathHint {
    pub field: String,
    pub path: String,
}

/// Boundary to the structured-message → update mapper.
///
/// With no hints the mapper applies its own per-PGN knowledge; with hints it
/// maps exactly the hinted fields.
pub trait DeltaMapper: Send {
    fn to_update(&self, message: &DecodedMessage, hints: Option<&[PathHint]>) -> Vec<PathValue>;
}

/// Reference mapper with direct field→path knowledge for a subset of PGNs.
/// PGNs outside this set fall back to the static path hint table.
#[derive(Debug, Default)]
pub struct StandardMapper;

const DIRECT_PATHS: &[(u32, &str, &str)] = &[
    (129026, "cog", "navigation.courseOverGroundTrue"),
    (129026, "sog", "navigation.speedOverGround"),
    (127250, "heading", "navigation.headingMagnetic"),
    (127250, "variation", "navigation.magneticVariation"),
    (127250, "deviation", "navigation.magneticDeviation"),
];

impl StandardMapper {
    pub fn new() -> Self {
        Self
    }
}

impl DeltaMapper for StandardMapper {
    fn to_update(&self, message: &DecodedMessage, hints: Option<&[PathHint]>) -> Vec<PathValue> {
        match hints {
            Some(hints) => hints
                .iter()
                .filter_map(|hint| {
                    message.fields.get(&hint.field).map(|value| PathValue {
                        path: hint.path.clone(),
                        value: value.clone(),
                    })
                })
                .collect(),
            None => message
                .fields
                .iter()
                .filter_map(|(field, value)| {
                    DIRECT_PATHS
                        .iter()
                        .find(|(pgn, name, _)| *pgn == message.pgn && name == field)
                        .map(|(_, _, path)| PathValue {
                            path: path.to_string(),
                            value: value.clone(),
                        })
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn message(pgn: u32, fields: &[(&str, f64)]) -> DecodedMessage {
        DecodedMessage {
            priority: 2,
            pgn,
            src: 5,
            dst: 255,
            data: vec![],
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), serde_json::json!(v)))
                .collect::<BTreeMap<_, _>>(),
            description: "test",
        }
    }

    #[test]
    fn test_direct_mapping() {
        let mapper = StandardMapper::new();
        let msg = message(129026, &[("cog", 1.5), ("sog", 3.2)]);
        let values = mapper.to_update(&msg, None);

        assert_eq!(values.len(), 2);
        assert!(values
            .iter()
            .any(|v| v.path == "navigation.courseOverGroundTrue"));
        assert!(values.iter().any(|v| v.path == "navigation.speedOverGround"));
    }

    #[test]
    fn test_unknown_pgn_yields_nothing_without_hints() {
        let mapper = StandardMapper::new();
        let msg = message(129025, &[("latitude", 52.0)]);
        assert!(mapper.to_update(&msg, None).is_empty());
    }

    #[test]
    fn test_hinted_mapping_uses_hint_paths() {
        let mapper = StandardMapper::new();
        let msg = message(129025, &[("latitude", 52.0), ("longitude", 5.0)]);
        let hints = vec![
            PathHint {
                field: "latitude".to_string(),
                path: "navigation.position.latitude".to_string(),
            },
            PathHint {
                field: "longitude".to_string(),
                path: "navigation.position.longitude".to_string(),
            },
        ];

        let values = mapper.to_update(&msg, Some(&hints));
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].path, "navigation.position.latitude");
    }

    #[test]
    fn test_hint_for_absent_field_is_skipped() {
        let mapper = StandardMapper::new();
        let msg = message(129025, &[("longitude", 5.0)]);
        let hints = vec![PathHint {
            field: "latitude".to_string(),
            path: "navigation.position.latitude".to_string(),
        }];
        assert!(mapper.to_update(&msg, Some(&hints)).is_empty());
    }
}
