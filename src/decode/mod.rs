pub mod canboat;
pub mod pgns;

use std::collections::BTreeMap;
use thiserror::Error;

pub use canboat::CanboatDecoder;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("unsupported PGN {0}")]
    UnsupportedPgn(u32),
}

/// A structured NMEA2000 message produced by the decoder. Immutable once
/// built; never persisted.
#[derive(Debug, Clone)]
pub struct DecodedMessage {
    pub priority: u8,
    pub pgn: u32,
    pub src: u8,
    pub dst: u8,
    pub data: Vec<u8>,
    pub fields: BTreeMap<String, serde_json::Value>,
    pub description: &'static str,
}

impl DecodedMessage {
    pub fn key(&self) -> SourceKey {
        SourceKey {
            pgn: self.pgn,
            src: self.src,
        }
    }
}

/// Identifies a logical signal stream `(PGN, source address)` for batching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceKey {
    pub pgn: u32,
    pub src: u8,
}

impl std::fmt::Display for SourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.pgn, self.src)
    }
}

/// Boundary to the frame decoder. The shipped implementation is
/// [`CanboatDecoder`]; anything that turns a normalized payload into a
/// [`DecodedMessage`] can be substituted.
pub trait FrameDecoder: Send {
    fn decode(&self, payload: &str) -> Result<DecodedMessage, DecodeError>;
}
