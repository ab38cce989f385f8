//! # Telemetry Records
//!
//! [`StorageEntry`] is the immutable snapshot taken on the ingestion path.
//! [`LogRecord`] is its flat JSON form in the session log:
//!
//! ```json
//! {"device_type":"beacon","datetime":1758460245,"device_name":"ANEMO1",
//!  "device_id":"AA:BB:CC:DD:EE:02","sequence":12,"wind_speed":6.4,"wind_direction":315.0}
//! ```

use serde::{Deserialize, Serialize};

use super::clock::Clock;
use crate::radio::protocol::DevicePayload;

/// Snapshot of one ingested message, queued for persistence
#[derive(Debug, Clone, PartialEq)]
pub struct StorageEntry {
    /// Monotonic reception time in milliseconds
    pub captured_at_ms: u64,

    /// Sender address
    pub identity: String,

    /// Sequence number carried by the message
    pub sequence: u32,

    /// Copy of the decoded payload
    pub payload: DevicePayload,

    /// Aggregated wind direction at capture time
    pub wind_direction: Option<f64>,
}

/// Wall-clock anchor read once per batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochReference {
    /// Wall-clock seconds since the Unix epoch
    pub epoch_secs: i64,

    /// Monotonic milliseconds read at the same instant
    pub monotonic_ms: u64,
}

impl EpochReference {
    /// Read both clocks, or `None` when the wall clock is not set
    pub fn capture(clock: &dyn Clock) -> Option<Self> {
        let epoch_secs = clock.wall_clock_epoch()?;
        Some(Self {
            epoch_secs,
            monotonic_ms: clock.now_monotonic_millis(),
        })
    }

    /// Wall-clock second of a monotonic capture time
    ///
    /// `epoch - (reference_ms - captured_ms) / 1000`, integer seconds. A
    /// capture time after the reference maps to the reference second.
    pub fn epoch_for(&self, captured_at_ms: u64) -> i64 {
        let age_secs = self.monotonic_ms.saturating_sub(captured_at_ms) / 1000;
        self.epoch_secs - age_secs as i64
    }
}

/// One flat object of the session log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "device_type", rename_all = "snake_case")]
pub enum LogRecord {
    Vehicle {
        datetime: Option<i64>,
        device_name: String,
        device_id: String,
        sequence: u32,
        latitude: f32,
        longitude: f32,
        speed: f32,
        heading: f32,
        satellites: u8,
        recording: bool,
        wind_direction: Option<f64>,
    },
    Beacon {
        datetime: Option<i64>,
        device_name: String,
        device_id: String,
        sequence: u32,
        wind_speed: f32,
        wind_direction: Option<f64>,
    },
    Buoy {
        datetime: Option<i64>,
        device_name: String,
        device_id: String,
        sequence: u32,
        latitude: f32,
        longitude: f32,
        heading: f32,
        heading_command: f32,
        throttle_command: i8,
        rudder_command: i8,
        nav_mode: u8,
    },
}

impl LogRecord {
    /// Build the log form of an entry
    ///
    /// # Arguments
    ///
    /// * `entry` - Snapshot from the handoff queue
    /// * `reference` - Batch wall-clock anchor; `None` writes `"datetime": null`
    pub fn from_entry(entry: &StorageEntry, reference: Option<&EpochReference>) -> Self {
        let datetime = reference.map(|r| r.epoch_for(entry.captured_at_ms));
        let device_id = entry.identity.clone();
        let sequence = entry.sequence;

        match &entry.payload {
            DevicePayload::Vehicle(v) => LogRecord::Vehicle {
                datetime,
                device_name: v.name.clone(),
                device_id,
                sequence,
                latitude: v.latitude,
                longitude: v.longitude,
                speed: v.speed,
                heading: v.heading,
                satellites: v.satellites,
                recording: v.recording,
                wind_direction: entry.wind_direction,
            },
            // A beacon's own vane wins over the fleet aggregate
            DevicePayload::Beacon(b) => LogRecord::Beacon {
                datetime,
                device_name: b.name.clone(),
                device_id,
                sequence,
                wind_speed: b.wind_speed,
                wind_direction: b.wind_direction.map(f64::from).or(entry.wind_direction),
            },
            DevicePayload::Buoy(b) => LogRecord::Buoy {
                datetime,
                device_name: b.name.clone(),
                device_id,
                sequence,
                latitude: b.latitude,
                longitude: b.longitude,
                heading: b.heading,
                heading_command: b.heading_command,
                throttle_command: b.throttle_command,
                rudder_command: b.rudder_command,
                nav_mode: b.nav_mode,
            },
        }
    }

    /// Wall-clock second of the record
    pub fn datetime(&self) -> Option<i64> {
        match self {
            LogRecord::Vehicle { datetime, .. }
            | LogRecord::Beacon { datetime, .. }
            | LogRecord::Buoy { datetime, .. } => *datetime,
        }
    }
}
