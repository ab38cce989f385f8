//! # Error Types
//!
//! Custom error types for the base station using `thiserror`.

use thiserror::Error;

/// Main error type for the base station
#[derive(Debug, Error)]
pub enum BaseStationError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Serial port errors
    #[error("Serial port error: {0}")]
    Serial(String),

    /// No bridge dongle could be opened on any candidate path
    #[error("No radio bridge found (tried: {0})")]
    SerialPortNotFound(String),

    /// Log storage cannot be used at all (directory missing, read-only medium)
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Log file exists but does not end with a valid closing bracket
    #[error("Corrupt log file: {0}")]
    CorruptLogFile(String),
}

/// Reasons a radio message is rejected by the decoder.
///
/// These never propagate past the ingestion path: the message is dropped
/// and counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Zero-length message
    #[error("empty message")]
    Empty,

    /// Leading discriminant byte does not name a known device kind
    #[error("unknown device kind 0x{0:02X}")]
    UnknownKind(u8),

    /// Length matches neither the current nor any legacy layout of the kind
    #[error("invalid length {len} for device kind {kind}")]
    InvalidLength { kind: u8, len: usize },
}

/// Result type alias for the base station
pub type Result<T> = std::result::Result<T, BaseStationError>;
