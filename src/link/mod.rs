//! # Radio Bridge Link Module
//!
//! Handles the serial connection to the USB radio bridge.
//!
//! This module handles:
//! - Opening the bridge serial port (auto-detect or configured path)
//! - Reading the byte stream and splitting it into bridge frames
//! - Yielding [`RawMessage`]s to the ingestion path

pub mod crc;
pub mod frame;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::error::{BaseStationError, Result};
pub use frame::{encode_frame, FrameDecoder, RawMessage};

/// Default bridge baud rate
pub const BRIDGE_BAUD_RATE: u32 = 115_200;

/// Default bridge device paths to try (in order of preference)
pub const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyUSB0", // CP210x / CH340 bridges on ESP32 dev boards
    "/dev/ttyACM0", // Native USB CDC (ESP32-S3)
];

/// Read granularity for the serial stream
const READ_CHUNK_SIZE: usize = 512;

/// Splits any byte stream into bridge messages
pub struct FrameReader<R> {
    reader: R,
    decoder: FrameDecoder,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Wrap a byte stream
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            decoder: FrameDecoder::new(),
        }
    }

    /// Wait for the next valid message
    ///
    /// Cancel-safe: bytes already read stay buffered for the next call.
    ///
    /// # Returns
    ///
    /// * `Result<Option<RawMessage>>` - Next message, or `None` once the stream ends
    pub async fn next_message(&mut self) -> Result<Option<RawMessage>> {
        loop {
            if let Some(message) = self.decoder.next_message() {
                return Ok(Some(message));
            }

            let buffer = self.decoder.buffer_mut();
            buffer.reserve(READ_CHUNK_SIZE);
            let n = self.reader.read_buf(buffer).await?;
            if n == 0 {
                return Ok(None);
            }
        }
    }

    /// Number of corrupt frames skipped so far
    pub fn rejected_frames(&self) -> u64 {
        self.decoder.rejected_frames()
    }
}

/// Serial connection to the radio bridge
pub struct BridgeLink {
    reader: FrameReader<tokio_serial::SerialStream>,
    device_path: String,
}

impl std::fmt::Debug for BridgeLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeLink")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl BridgeLink {
    /// Open the bridge, trying each path in order
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyUSB0"])
    /// * `baud_rate` - Serial speed of the bridge firmware
    ///
    /// # Errors
    ///
    /// Returns [`BaseStationError::SerialPortNotFound`] if no path opens
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open bridge port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Opened radio bridge at {} ({} baud)", path, baud_rate);
                    return Ok(Self {
                        reader: FrameReader::new(port),
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                }
            }
        }

        Err(BaseStationError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open the configured port, or auto-detect when `port` is empty
    pub fn open(port: &str, baud_rate: u32) -> Result<Self> {
        if port.is_empty() {
            Self::open_with_paths(DEFAULT_DEVICE_PATHS, baud_rate)
        } else {
            Self::open_with_paths(&[port], baud_rate)
        }
    }

    /// Open a specific serial port with 8N1 settings
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| BaseStationError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Wait for the next radio message forwarded by the bridge
    pub async fn next_message(&mut self) -> Result<Option<RawMessage>> {
        self.reader.next_message().await
    }

    /// Number of corrupt frames skipped so far
    pub fn rejected_frames(&self) -> u64 {
        self.reader.rejected_frames()
    }

    /// Path of the opened serial device
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}
