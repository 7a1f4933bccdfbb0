//! Static fallback table mapping PGNs to output paths.
//!
//! Used when the mapper yields nothing on its own: each non-null field gets
//! a path derived from its template, either a suffix appended to the entry's
//! base path or a resolver function for paths that depend on message content.

use crate::decode::DecodedMessage;

#[derive(Clone, Copy)]
pub enum PathTemplate {
    /// Suffix concatenated onto the entry's base path.
    Literal(&'static str),
    /// Path computed from the message and field name.
    Computed(fn(&DecodedMessage, &str) -> String),
}

pub struct FieldHint {
    pub field: &'static str,
    pub template: PathTemplate,
}

pub struct PathHintEntry {
    pub base: &'static str,
    pub fields: &'static [FieldHint],
    /// Collapse leaf paths sharing a parent into one object-valued update.
    pub aggregate: bool,
}

impl PathHintEntry {
    pub fn resolve(&self, message: &DecodedMessage, hint: &FieldHint) -> String {
        match hint.template {
            PathTemplate::Literal(suffix) => format!("{}.{}", self.base, suffix),
            PathTemplate::Computed(resolver) => resolver(message, hint.field),
        }
    }
}

pub struct PathHintTable;

impl PathHintTable {
    pub fn lookup(pgn: u32) -> Option<&'static PathHintEntry> {
        match pgn {
            129025 => Some(&POSITION),
            128267 => Some(&DEPTH),
            130306 => Some(&WIND),
            _ => None,
        }
    }
}

static POSITION: PathHintEntry = PathHintEntry {
    base: "navigation.position",
    fields: &[
        FieldHint {
            field: "latitude",
            template: PathTemplate::Literal("latitude"),
        },
        FieldHint {
            field: "longitude",
            template: PathTemplate::Literal("longitude"),
        },
    ],
    aggregate: true,
};

static DEPTH: PathHintEntry = PathHintEntry {
    base: "environment.depth",
    fields: &[
        FieldHint {
            field: "depth",
            template: PathTemplate::Literal("belowTransducer"),
        },
        FieldHint {
            field: "offset",
            template: PathTemplate::Literal("surfaceToTransducer"),
        },
    ],
    aggregate: false,
};

static WIND: PathHintEntry = PathHintEntry {
    base: "environment.wind",
    fields: &[
        FieldHint {
            field: "windSpeed",
            template: PathTemplate::Computed(wind_path),
        },
        FieldHint {
            field: "windAngle",
            template: PathTemplate::Computed(wind_path),
        },
    ],
    aggregate: false,
};

/// Wind paths depend on the reference field (byte 5, low 3 bits): reference 2
/// is apparent wind, everything else is treated as true water-referenced.
fn wind_path(message: &DecodedMessage, field: &str) -> String {
    let apparent = message.data.get(5).map(|b| b & 0x7) == Some(2);
    match (field, apparent) {
        ("windSpeed", true) => "environment.wind.speedApparent".to_string(),
        ("windSpeed", false) => "environment.wind.speedTrue".to_string(),
        ("windAngle", true) => "environment.wind.angleApparent".to_string(),
        (_, _) => "environment.wind.angleTrueWater".to_string(),
    }
}
