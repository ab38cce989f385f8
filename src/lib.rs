//! # Sailing Base Station Library
//!
//! Shore-side telemetry aggregator for RC sailing fleets.
//!
//! This library receives broadcast radio messages from sailing vehicles, wind
//! beacons and navigation buoys through a USB radio bridge, tracks every
//! device with its packet loss, derives a fleet wind direction and records
//! the session to a JSON log for later replay.

pub mod config;
pub mod error;
pub mod link;
pub mod radio;
pub mod registry;
pub mod station;
pub mod telemetry;
