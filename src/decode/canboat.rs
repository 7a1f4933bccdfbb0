//! Canboat-style reference decoder.
//!
//! Accepts the two payload shapes the normalizer produces:
//!
//! - comma CSV (`[timestamp,]prio,pgn,src,dst,len,<hex bytes...>`) from
//!   semicolon-delimited and analyzer-format logs;
//! - candump frames (`iface id#hex` or `iface id [n] hex...`), whose 29-bit
//!   CAN identifier is decomposed into priority / PGN / addresses.

use super::pgns;
use super::{DecodeError, DecodedMessage, FrameDecoder};

#[derive(Debug, Default)]
pub struct CanboatDecoder;

impl CanboatDecoder {
    pub fn new() -> Self {
        Self
    }

    fn decode_csv(&self, payload: &str) -> Result<DecodedMessage, DecodeError> {
        let mut fields: Vec<&str> = payload.split(',').map(str::trim).collect();

        // Analyzer-format lines carry a leading timestamp field; the
        // priority field is a small integer, the timestamp is not.
        if fields.first().is_some_and(|f| f.parse::<u8>().is_err()) {
            fields.remove(0);
        }

        if fields.len() < 5 {
            return Err(DecodeError::Malformed(format!(
                "expected prio,pgn,src,dst,len: '{}'",
                payload
            )));
        }

        let priority = parse_num::<u8>(fields[0], "priority")?;
        let pgn = parse_num::<u32>(fields[1], "pgn")?;
        let src = parse_num::<u8>(fields[2], "src")?;
        let dst = parse_num::<u8>(fields[3], "dst")?;
        let len = parse_num::<usize>(fields[4], "len")?;

        if fields.len() < 5 + len {
            return Err(DecodeError::Malformed(format!(
                "frame announces {} data bytes but carries {}",
                len,
                fields.len() - 5
            )));
        }

        let data = fields[5..5 + len]
            .iter()
            .map(|b| {
                u8::from_str_radix(b, 16)
                    .map_err(|_| DecodeError::Malformed(format!("bad hex byte '{}'", b)))
            })
            .collect::<Result<Vec<u8>, _>>()?;

        self.build(priority, pgn, src, dst, data)
    }

    fn decode_frame(&self, payload: &str) -> Result<DecodedMessage, DecodeError> {
        let tokens: Vec<&str> = payload.split_whitespace().collect();
        if tokens.len() < 2 {
            return Err(DecodeError::Malformed(payload.to_string()));
        }

        let (can_id, data) = if let Some((id, hex)) = tokens[1].split_once('#') {
            let id = u32::from_str_radix(id, 16)
                .map_err(|_| DecodeError::Malformed(format!("bad CAN id '{}'", id)))?;
            if hex.len() % 2 != 0 {
                return Err(DecodeError::Malformed(format!("odd hex payload '{}'", hex)));
            }
            let data = (0..hex.len())
                .step_by(2)
                .map(|i| {
                    u8::from_str_radix(&hex[i..i + 2], 16)
                        .map_err(|_| DecodeError::Malformed(format!("bad hex payload '{}'", hex)))
                })
                .collect::<Result<Vec<u8>, _>>()?;
            (id, data)
        } else {
            if tokens.len() < 3 {
                return Err(DecodeError::Malformed(payload.to_string()));
            }
            let id = u32::from_str_radix(tokens[1], 16)
                .map_err(|_| DecodeError::Malformed(format!("bad CAN id '{}'", tokens[1])))?;
            let data = tokens[3..]
                .iter()
                .map(|b| {
                    u8::from_str_radix(b, 16)
                        .map_err(|_| DecodeError::Malformed(format!("bad hex byte '{}'", b)))
                })
                .collect::<Result<Vec<u8>, _>>()?;
            (id, data)
        };

        let (priority, pgn, src, dst) = split_can_id(can_id);
        self.build(priority, pgn, src, dst, data)
    }

    fn build(
        &self,
        priority: u8,
        pgn: u32,
        src: u8,
        dst: u8,
        data: Vec<u8>,
    ) -> Result<DecodedMessage, DecodeError> {
        let (fields, description) = pgns::decode_fields(pgn, &data)?;

        Ok(DecodedMessage {
            priority,
            pgn,
            src,
            dst,
            data,
            fields,
            description,
        })
    }
}

impl FrameDecoder for CanboatDecoder {
    fn decode(&self, payload: &str) -> Result<DecodedMessage, DecodeError> {
        if payload.contains(',') {
            self.decode_csv(payload)
        } else {
            self.decode_frame(payload)
        }
    }
}

fn parse_num<T: std::str::FromStr>(value: &str, what: &str) -> Result<T, DecodeError> {
    value
        .parse()
        .map_err(|_| DecodeError::Malformed(format!("bad {} '{}'", what, value)))
}

/// Decompose a 29-bit extended CAN identifier into (priority, pgn, src, dst).
/// PDU1 frames (PF < 240) are destination-specific; PDU2 frames are broadcast.
fn split_can_id(id: u32) -> (u8, u32, u8, u8) {
    let priority = ((id >> 26) & 0x7) as u8;
    let src = (id & 0xff) as u8;
    let dp = (id >> 24) & 0x3;
    let pf = (id >> 16) & 0xff;
    let ps = (id >> 8) & 0xff;

    if pf < 240 {
        (priority, (dp << 16) | (pf << 8), src, ps as u8)
    } else {
        (priority, (dp << 16) | (pf << 8) | ps, src, 255)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_payload() {
        let decoder = CanboatDecoder::new();
        let msg = decoder
            .decode("1,129025,5,255,8,10,20,30,40,50,60,70,80")
            .unwrap();

        assert_eq!(msg.priority, 1);
        assert_eq!(msg.pgn, 129025);
        assert_eq!(msg.src, 5);
        assert_eq!(msg.dst, 255);
        assert_eq!(msg.data.len(), 8);
        assert_eq!(msg.data[0], 0x10);
        assert!(!msg.fields.is_empty());
        assert_eq!(msg.description, "Position, Rapid Update");
    }

    #[test]
    fn test_csv_payload_with_timestamp_prefix() {
        let decoder = CanboatDecoder::new();
        let msg = decoder
            .decode("2023-06-15T12:00:00.000Z,2,127250,12,255,8,00,98,3a,ff,7f,ff,7f,fd")
            .unwrap();
        assert_eq!(msg.pgn, 127250);
        assert_eq!(msg.src, 12);
    }

    #[test]
    fn test_csv_short_data_rejected() {
        let decoder = CanboatDecoder::new();
        let result = decoder.decode("1,129025,5,255,8,10,20");
        assert!(matches!(result, Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_candump_hash_frame() {
        // prio 2, PGN 129025 (0x1F801), src 5
        let id = (2u32 << 26) | (129025u32 << 8) | 5;
        let decoder = CanboatDecoder::new();
        let msg = decoder
            .decode(&format!("vcan0 {:08X}#0011223344556677", id))
            .unwrap();
        assert_eq!(msg.priority, 2);
        assert_eq!(msg.pgn, 129025);
        assert_eq!(msg.src, 5);
        assert_eq!(msg.dst, 255);
        assert_eq!(msg.data, vec![0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77]);
    }

    #[test]
    fn test_candump_bracket_frame() {
        let id = (2u32 << 26) | (130306u32 << 8) | 9;
        let decoder = CanboatDecoder::new();
        let msg = decoder
            .decode(&format!("can0 {:08X} [8] 00 64 00 10 27 fa ff ff", id))
            .unwrap();
        assert_eq!(msg.pgn, 130306);
        assert_eq!(msg.src, 9);
        assert_eq!(msg.fields["windSpeed"], 1.0);
    }

    #[test]
    fn test_pdu1_destination_address() {
        // PF 0xEF < 240: PGN 0xEF00 with PS as destination
        let id = (6u32 << 26) | (0xEF_00u32 << 8) | (0x42 << 8) | 7;
        let (priority, pgn, src, dst) = split_can_id(id);
        assert_eq!(priority, 6);
        assert_eq!(pgn, 0xEF00);
        assert_eq!(src, 7);
        assert_eq!(dst, 0x42);
    }

    #[test]
    fn test_unsupported_pgn_propagates() {
        let decoder = CanboatDecoder::new();
        let result = decoder.decode("2,60928,5,255,8,00,00,00,00,00,00,00,00");
        assert!(matches!(result, Err(DecodeError::UnsupportedPgn(60928))));
    }
}
