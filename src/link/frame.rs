//! # Bridge Frame Codec
//!
//! The USB radio bridge forwards every received radio message to the host
//! wrapped in a small envelope:
//!
//! ```text
//! +------+-----+------------+-------------+-----+
//! | 0xA5 | len | sender[6]  | payload[len]| crc |
//! +------+-----+------------+-------------+-----+
//! ```
//!
//! The CRC-8/DVB-S2 covers `len`, `sender` and `payload`. The decoder keeps
//! a rolling buffer and resynchronises on the next sync byte whenever a
//! frame fails validation.

use bytes::{Buf, BytesMut};
use tracing::debug;

use super::crc::crc8_dvb_s2;
use crate::radio::protocol::MacAddress;

/// Bridge frame sync byte
pub const BRIDGE_SYNC_BYTE: u8 = 0xA5;

/// Largest radio payload the bridge forwards (ESP-NOW limit)
pub const BRIDGE_MAX_PAYLOAD: usize = 250;

/// Bytes around the payload: sync + len + sender + crc
pub const BRIDGE_FRAME_OVERHEAD: usize = 1 + 1 + 6 + 1;

/// A radio message exactly as received, before classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// Link-layer address of the sender
    pub sender: MacAddress,

    /// Message bytes, discriminant first
    pub bytes: Vec<u8>,
}

/// Wrap a radio message in a bridge frame
///
/// # Arguments
///
/// * `sender` - Link-layer address of the sender
/// * `payload` - Radio message (at most 250 bytes; longer input is truncated)
///
/// # Returns
///
/// * `Vec<u8>` - Complete bridge frame
pub fn encode_frame(sender: &MacAddress, payload: &[u8]) -> Vec<u8> {
    let payload = &payload[..payload.len().min(BRIDGE_MAX_PAYLOAD)];

    let mut frame = Vec::with_capacity(BRIDGE_FRAME_OVERHEAD + payload.len());
    frame.push(BRIDGE_SYNC_BYTE);
    frame.push(payload.len() as u8);
    frame.extend_from_slice(sender);
    frame.extend_from_slice(payload);

    let crc = crc8_dvb_s2(&frame[1..]);
    frame.push(crc);
    frame
}

/// Incremental bridge frame decoder
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: BytesMut,
    rejected_frames: u64,
}

impl FrameDecoder {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes read from the serial line
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Buffer the reader fills directly
    pub(crate) fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }

    /// Number of candidate frames rejected for length or CRC
    pub fn rejected_frames(&self) -> u64 {
        self.rejected_frames
    }

    /// Extract the next complete frame, if one is buffered
    ///
    /// Bytes preceding a sync byte are discarded. A frame that fails
    /// validation costs one byte and scanning restarts from there.
    pub fn next_message(&mut self) -> Option<RawMessage> {
        loop {
            match self.buffer.iter().position(|&b| b == BRIDGE_SYNC_BYTE) {
                Some(start) => self.buffer.advance(start),
                None => {
                    self.buffer.clear();
                    return None;
                }
            }

            if self.buffer.len() < 2 {
                return None;
            }

            let len = self.buffer[1] as usize;
            if len > BRIDGE_MAX_PAYLOAD {
                self.reject(format_args!("length {} exceeds maximum", len));
                continue;
            }

            let total = BRIDGE_FRAME_OVERHEAD + len;
            if self.buffer.len() < total {
                return None;
            }

            let expected = crc8_dvb_s2(&self.buffer[1..total - 1]);
            let received = self.buffer[total - 1];
            if expected != received {
                self.reject(format_args!(
                    "CRC mismatch: expected 0x{:02X}, got 0x{:02X}",
                    expected, received
                ));
                continue;
            }

            let frame = self.buffer.split_to(total);
            let mut sender = [0u8; 6];
            sender.copy_from_slice(&frame[2..8]);
            return Some(RawMessage {
                sender,
                bytes: frame[8..total - 1].to_vec(),
            });
        }
    }

    fn reject(&mut self, reason: std::fmt::Arguments<'_>) {
        debug!("Dropping bridge frame candidate: {}", reason);
        self.rejected_frames += 1;
        self.buffer.advance(1);
    }
}
