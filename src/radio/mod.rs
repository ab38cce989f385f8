//! # Radio Message Module
//!
//! Fixed-format status messages broadcast by the fleet over the radio link.
//!
//! This module handles:
//! - Device-kind discriminants and layout sizes (current and legacy)
//! - Classifying raw messages into typed [`protocol::DecodedRecord`]s
//! - Encoding current layouts (fixtures and bench tooling)

pub mod protocol;
pub mod decoder;
pub mod encoder;
