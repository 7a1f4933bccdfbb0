//! Field decoding for the supported PGNs.
//!
//! Values follow canboat conventions: little-endian integers scaled by a
//! per-field resolution, with all-ones sentinels meaning "not available".
//! Unavailable fields are omitted from the output map, so a frame whose
//! fields are all unavailable decodes to an empty map.

use super::DecodeError;
use serde_json::{json, Value};
use std::collections::BTreeMap;

const RAD_PER_UNIT: f64 = 0.0001;

pub fn decode_fields(
    pgn: u32,
    data: &[u8],
) -> Result<(BTreeMap<String, Value>, &'static str), DecodeError> {
    let mut fields = BTreeMap::new();

    let description = match pgn {
        129025 => {
            put(&mut fields, "latitude", i32_le(data, 0).map(|v| v as f64 * 1e-7));
            put(&mut fields, "longitude", i32_le(data, 4).map(|v| v as f64 * 1e-7));
            "Position, Rapid Update"
        }
        129026 => {
            put(&mut fields, "cog", angle(data, 2));
            put(&mut fields, "sog", u16_le(data, 4).map(|v| v as f64 * 0.01));
            "COG & SOG, Rapid Update"
        }
        127250 => {
            put(&mut fields, "heading", angle(data, 1));
            put(&mut fields, "deviation", signed_angle(data, 3));
            put(&mut fields, "variation", signed_angle(data, 5));
            "Vessel Heading"
        }
        127251 => {
            put(
                &mut fields,
                "rateOfTurn",
                i32_le(data, 1).map(|v| v as f64 * 3.125e-8),
            );
            "Rate of Turn"
        }
        128267 => {
            put(&mut fields, "depth", u32_le(data, 1).map(|v| v as f64 * 0.01));
            put(
                &mut fields,
                "offset",
                i16_le(data, 5).map(|v| v as f64 * 0.001),
            );
            "Water Depth"
        }
        130306 => {
            put(
                &mut fields,
                "windSpeed",
                u16_le(data, 1).map(|v| v as f64 * 0.01),
            );
            put(&mut fields, "windAngle", angle(data, 3));
            "Wind Data"
        }
        other => return Err(DecodeError::UnsupportedPgn(other)),
    };

    Ok((fields, description))
}

fn put(fields: &mut BTreeMap<String, Value>, name: &str, value: Option<f64>) {
    if let Some(v) = value {
        fields.insert(name.to_string(), json!(v));
    }
}

fn u16_le(data: &[u8], offset: usize) -> Option<u16> {
    let bytes: [u8; 2] = data.get(offset..offset + 2)?.try_into().ok()?;
    match u16::from_le_bytes(bytes) {
        0xffff => None,
        v => Some(v),
    }
}

fn i16_le(data: &[u8], offset: usize) -> Option<i16> {
    let bytes: [u8; 2] = data.get(offset..offset + 2)?.try_into().ok()?;
    // Max-positive is the canboat sentinel; all-ones covers 0xFF padding.
    match i16::from_le_bytes(bytes) {
        0x7fff | -1 => None,
        v => Some(v),
    }
}

fn u32_le(data: &[u8], offset: usize) -> Option<u32> {
    let bytes: [u8; 4] = data.get(offset..offset + 4)?.try_into().ok()?;
    match u32::from_le_bytes(bytes) {
        0xffff_ffff => None,
        v => Some(v),
    }
}

fn i32_le(data: &[u8], offset: usize) -> Option<i32> {
    let bytes: [u8; 4] = data.get(offset..offset + 4)?.try_into().ok()?;
    match i32::from_le_bytes(bytes) {
        0x7fff_ffff | -1 => None,
        v => Some(v),
    }
}

fn angle(data: &[u8], offset: usize) -> Option<f64> {
    u16_le(data, offset).map(|v| v as f64 * RAD_PER_UNIT)
}

fn signed_angle(data: &[u8], offset: usize) -> Option<f64> {
    i16_le(data, offset).map(|v| v as f64 * RAD_PER_UNIT)
}
