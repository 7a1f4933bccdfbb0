use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use regex::Regex;

/// A log line reduced to its protocol payload plus an optional source
/// timestamp. The timestamp is `None` for encodings that carry no time
/// information (plain bus dumps).
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub payload: String,
    pub timestamp_ms: Option<i64>,
}

/// Detects one of the supported textual log encodings and extracts the
/// protocol line. Recognized encodings, first match wins:
///
/// 1. Semicolon-delimited record: `<ts>;<meta>;<payload>`
/// 2. Parenthesized-timestamp bus dump: `(1700000000.123) can0 1DF80105#...`
/// 3. Plain bus-dump frame: `can0 1DF80105 [8] 00 11 ...`
/// 4. ISO-8601-prefixed CSV (canboat analyzer format)
///
/// Anything else is noise and yields `None`.
pub struct Normalizer {
    paren_re: Regex,
    iface_re: Regex,
    iso_prefix_re: Regex,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self {
            paren_re: Regex::new(r"^\((\d+(?:\.\d+)?)\)\s+(.+)$").unwrap(),
            iface_re: Regex::new(r"^(?:v|sl)?can\d+$").unwrap(),
            iso_prefix_re: Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}").unwrap(),
        }
    }

    pub fn normalize(&self, line: &str) -> Option<NormalizedRecord> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        if let Some(record) = self.semicolon_record(line) {
            return Some(record);
        }
        if let Some(record) = self.paren_dump(line) {
            return Some(record);
        }
        if let Some(record) = self.plain_dump(line) {
            return Some(record);
        }
        if let Some(record) = self.iso_csv(line) {
            return Some(record);
        }

        None
    }

    /// `<ts>;<meta>;<payload>` with at least three fields. The timestamp is
    /// parsed as a float of milliseconds; an unparseable timestamp still
    /// yields a record, just without one.
    fn semicolon_record(&self, line: &str) -> Option<NormalizedRecord> {
        let fields: Vec<&str> = line.split(';').collect();
        if fields.len() < 3 {
            return None;
        }

        let timestamp_ms = fields[0]
            .trim()
            .parse::<f64>()
            .ok()
            .map(|v| v.round() as i64);

        Some(NormalizedRecord {
            payload: fields[2].to_string(),
            timestamp_ms,
        })
    }

    /// `(<unixSeconds>[.<frac>]) <rest>` where `<rest>` names a CAN
    /// interface. Internal whitespace in `<rest>` is collapsed.
    fn paren_dump(&self, line: &str) -> Option<NormalizedRecord> {
        let captures = self.paren_re.captures(line)?;
        let rest = captures.get(2).unwrap().as_str();

        if !rest
            .split_whitespace()
            .any(|token| self.iface_re.is_match(token))
        {
            return None;
        }

        let seconds: f64 = captures.get(1).unwrap().as_str().parse().ok()?;
        let payload = rest.split_whitespace().collect::<Vec<_>>().join(" ");

        Some(NormalizedRecord {
            payload,
            timestamp_ms: Some((seconds * 1000.0).round() as i64),
        })
    }

    /// `<iface> <hexCanId> [<len>] <hex bytes...>` with no timestamp.
    fn plain_dump(&self, line: &str) -> Option<NormalizedRecord> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 3 {
            return None;
        }
        if !self.iface_re.is_match(tokens[0]) {
            return None;
        }
        u32::from_str_radix(tokens[1], 16).ok()?;

        let len: usize = tokens[2]
            .strip_prefix('[')?
            .strip_suffix(']')?
            .parse()
            .ok()?;
        if tokens.len() < 3 + len {
            return None;
        }
        for byte in &tokens[3..3 + len] {
            u8::from_str_radix(byte, 16).ok()?;
        }

        Some(NormalizedRecord {
            payload: tokens.join(" "),
            timestamp_ms: None,
        })
    }

    /// CSV whose first field is a `YYYY-MM-DDTHH:MM:SS`-prefixed timestamp.
    /// The payload is the full line; the decoder strips the timestamp field.
    fn iso_csv(&self, line: &str) -> Option<NormalizedRecord> {
        if !self.iso_prefix_re.is_match(line) {
            return None;
        }

        let first = line.split(',').next()?;
        let timestamp = parse_iso_instant(first)?;

        Some(NormalizedRecord {
            payload: line.to_string(),
            timestamp_ms: Some(timestamp.timestamp_millis()),
        })
    }
}

fn parse_iso_instant(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    // Analyzer logs often omit the zone suffix; treat those as UTC.
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|ndt| Utc.from_utc_datetime(&ndt))
}
