use crate::decode::DecodedMessage;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("bus send failed: {0}")]
    Send(String),
}

/// A raw extended CAN frame ready for a bus transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanFrame {
    pub id: u32,
    pub ext: bool,
    pub data: Vec<u8>,
}

impl CanFrame {
    /// Reassemble the 29-bit identifier from a decoded message.
    pub fn from_message(message: &DecodedMessage) -> Self {
        let id = ((message.priority as u32) << 26) | (message.pgn << 8) | message.src as u32;
        Self {
            id,
            ext: true,
            data: message.data.clone(),
        }
    }
}

/// Bus transport boundary. The live socketcan transport lives outside this
/// crate; [`TraceBus`] stands in when replaying without hardware.
pub trait FrameSink: Send {
    fn send(&mut self, frame: &CanFrame) -> Result<(), BusError>;
}

/// Logs every frame instead of writing it to a socket.
#[derive(Debug)]
pub struct TraceBus {
    interface: String,
}

impl TraceBus {
    pub fn new(interface: &str) -> Self {
        Self {
            interface: interface.to_string(),
        }
    }
}

impl FrameSink for TraceBus {
    fn send(&mut self, frame: &CanFrame) -> Result<(), BusError> {
        debug!(
            interface = %self.interface,
            id = %format_args!("{:08X}", frame.id),
            len = frame.data.len(),
            "frame"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_frame_id_reassembly() {
        let message = DecodedMessage {
            priority: 2,
            pgn: 129025,
            src: 5,
            dst: 255,
            data: vec![1, 2, 3],
            fields: BTreeMap::new(),
            description: "test",
        };

        let frame = CanFrame::from_message(&message);
        assert_eq!(frame.id, (2 << 26) | (129025 << 8) | 5);
        assert!(frame.ext);
        assert_eq!(frame.data, vec![1, 2, 3]);
    }
}
