//! # Radio Protocol Constants and Types
//!
//! Core definitions for the fleet's broadcast messages.
//!
//! Every message starts with a one-byte discriminant naming the device kind.
//! The remaining bytes follow a packed little-endian layout whose total size
//! identifies the firmware generation that produced it.

use std::fmt;

/// Link-layer address of a sender (6 bytes)
pub type MacAddress = [u8; 6];

/// Discriminant byte for vehicle (sailing boat) messages
pub const KIND_VEHICLE: u8 = 1;

/// Discriminant byte for wind beacon (anemometer) messages
pub const KIND_BEACON: u8 = 2;

/// Discriminant byte for navigation buoy messages
pub const KIND_BUOY: u8 = 3;

/// Size of the fixed, NUL-padded name field
pub const NAME_FIELD_SIZE: usize = 18;

/// Vehicle message: kind + name + sequence + gps time + 4 floats + satellites + recording
pub const VEHICLE_MESSAGE_SIZE: usize = 45;

/// Legacy vehicle message without name and sequence number
pub const VEHICLE_LEGACY_MESSAGE_SIZE: usize = 23;

/// Beacon message: kind + name + mac + speed + direction + sequence
pub const BEACON_MESSAGE_SIZE: usize = 37;

/// Legacy beacon message with string name but no direction or sequence
pub const BEACON_LEGACY_V2_MESSAGE_SIZE: usize = 29;

/// First-generation beacon message with a numeric identifier
pub const BEACON_LEGACY_V1_MESSAGE_SIZE: usize = 15;

/// Buoy message: kind + name + sequence + 4 floats + throttle + rudder + mode
pub const BUOY_MESSAGE_SIZE: usize = 42;

/// Sequence number assigned to legacy messages, which carry none
pub const LEGACY_SEQUENCE: u32 = 0;

/// Metres per second to knots
pub const MPS_TO_KNOTS: f32 = 1.94384;

/// Fixed set of device kinds in the fleet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// Sailing vehicle reporting GPS navigation data
    Vehicle,
    /// Wind beacon reporting wind speed and direction
    Beacon,
    /// Autonomous navigation buoy reporting position and autopilot commands
    Buoy,
}

impl DeviceKind {
    /// Map a discriminant byte to a device kind
    pub fn from_discriminant(byte: u8) -> Option<Self> {
        match byte {
            KIND_VEHICLE => Some(Self::Vehicle),
            KIND_BEACON => Some(Self::Beacon),
            KIND_BUOY => Some(Self::Buoy),
            _ => None,
        }
    }

    /// Discriminant byte for this kind
    pub fn discriminant(self) -> u8 {
        match self {
            Self::Vehicle => KIND_VEHICLE,
            Self::Beacon => KIND_BEACON,
            Self::Buoy => KIND_BUOY,
        }
    }

    /// Tag written to the `device_type` field of log records
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vehicle => "vehicle",
            Self::Beacon => "beacon",
            Self::Buoy => "buoy",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vehicle navigation telemetry
#[derive(Debug, Clone, PartialEq)]
pub struct VehiclePayload {
    /// Boat name
    pub name: String,

    /// GPS time in seconds since Unix epoch (0 when no fix)
    pub gps_timestamp: u32,

    /// Latitude in degrees
    pub latitude: f32,

    /// Longitude in degrees
    pub longitude: f32,

    /// Speed over ground in m/s
    pub speed: f32,

    /// Course over ground in degrees (0 = N, 90 = E)
    pub heading: f32,

    /// Number of satellites in view
    pub satellites: u8,

    /// Whether the vehicle is recording its own GPS track
    pub recording: bool,
}

impl VehiclePayload {
    /// Speed over ground in knots
    pub fn speed_knots(&self) -> f32 {
        self.speed * MPS_TO_KNOTS
    }
}

/// Wind beacon telemetry
#[derive(Debug, Clone, PartialEq)]
pub struct BeaconPayload {
    /// Beacon name
    pub name: String,

    /// Wind speed in m/s
    pub wind_speed: f32,

    /// Wind direction in degrees; legacy beacons have no vane
    pub wind_direction: Option<f32>,
}

/// Navigation buoy telemetry
#[derive(Debug, Clone, PartialEq)]
pub struct BuoyPayload {
    /// Buoy name
    pub name: String,

    /// Latitude in degrees
    pub latitude: f32,

    /// Longitude in degrees
    pub longitude: f32,

    /// Current heading in degrees
    pub heading: f32,

    /// Autopilot heading command in degrees
    pub heading_command: f32,

    /// Autopilot throttle command (-100..=100 %)
    pub throttle_command: i8,

    /// Autopilot rudder command (-100..=100 %)
    pub rudder_command: i8,

    /// Autopilot navigation mode
    pub nav_mode: u8,
}

/// Kind-specific payload of a decoded message
#[derive(Debug, Clone, PartialEq)]
pub enum DevicePayload {
    Vehicle(VehiclePayload),
    Beacon(BeaconPayload),
    Buoy(BuoyPayload),
}

impl DevicePayload {
    /// Device kind of this payload
    pub fn kind(&self) -> DeviceKind {
        match self {
            Self::Vehicle(_) => DeviceKind::Vehicle,
            Self::Beacon(_) => DeviceKind::Beacon,
            Self::Buoy(_) => DeviceKind::Buoy,
        }
    }

    /// Name the device reports for itself
    pub fn name(&self) -> &str {
        match self {
            Self::Vehicle(v) => &v.name,
            Self::Beacon(b) => &b.name,
            Self::Buoy(b) => &b.name,
        }
    }
}

/// A classified radio message
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRecord {
    /// Sender address formatted as `AA:BB:CC:DD:EE:FF`
    pub identity: String,

    /// Per-device message counter
    pub sequence: u32,

    /// Monotonic clock reading at reception, in milliseconds
    pub captured_at_ms: u64,

    /// Kind-specific fields
    pub payload: DevicePayload,
}

impl DecodedRecord {
    /// Device kind of this record
    pub fn kind(&self) -> DeviceKind {
        self.payload.kind()
    }
}

/// Format a link-layer address as upper-case colon-separated hex
///
/// # Examples
///
/// ```
/// use sailing_basestation::radio::protocol::format_mac;
///
/// assert_eq!(format_mac(&[0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x01]), "AA:BB:CC:DD:EE:01");
/// ```
pub fn format_mac(mac: &MacAddress) -> String {
    format!(
        "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
        mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_discriminants() {
        assert_eq!(KIND_VEHICLE, 1);
        assert_eq!(KIND_BEACON, 2);
        assert_eq!(KIND_BUOY, 3);
        for kind in [DeviceKind::Vehicle, DeviceKind::Beacon, DeviceKind::Buoy] {
            assert_eq!(DeviceKind::from_discriminant(kind.discriminant()), Some(kind));
        }
        assert_eq!(DeviceKind::from_discriminant(0), None);
        assert_eq!(DeviceKind::from_discriminant(4), None);
    }

    #[test]
    fn test_layout_sizes_are_distinct_per_kind() {
        assert_eq!(VEHICLE_MESSAGE_SIZE, 1 + NAME_FIELD_SIZE + 4 + 4 + 16 + 1 + 1);
        assert_eq!(VEHICLE_LEGACY_MESSAGE_SIZE, 1 + 4 + 16 + 1 + 1);
        assert_eq!(BEACON_MESSAGE_SIZE, 1 + NAME_FIELD_SIZE + 6 + 4 + 4 + 4);
        assert_eq!(BEACON_LEGACY_V2_MESSAGE_SIZE, 1 + NAME_FIELD_SIZE + 6 + 4);
        assert_eq!(BEACON_LEGACY_V1_MESSAGE_SIZE, 1 + 4 + 6 + 4);
        assert_eq!(BUOY_MESSAGE_SIZE, 1 + NAME_FIELD_SIZE + 4 + 16 + 3);
    }

    #[test]
    fn test_speed_knots() {
        let vehicle = VehiclePayload {
            name: "FRA222".to_string(),
            gps_timestamp: 0,
            latitude: 0.0,
            longitude: 0.0,
            speed: 5.0,
            heading: 0.0,
            satellites: 0,
            recording: false,
        };
        assert!((vehicle.speed_knots() - 9.7192).abs() < 1e-4);
    }

    #[test]
    fn test_format_mac() {
        assert_eq!(format_mac(&[0x24, 0xA1, 0x60, 0x45, 0xE7, 0xF8]), "24:A1:60:45:E7:F8");
        assert_eq!(format_mac(&[0; 6]), "00:00:00:00:00:00");
    }

    #[test]
    fn test_kind_strings() {
        assert_eq!(DeviceKind::Vehicle.to_string(), "vehicle");
        assert_eq!(DeviceKind::Beacon.as_str(), "beacon");
        assert_eq!(DeviceKind::Buoy.as_str(), "buoy");
    }
}
