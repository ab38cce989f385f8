//! # Radio Message Encoder
//!
//! Encodes payloads into the current broadcast layouts.
//!
//! The base station only receives; these encoders exist for bench tooling
//! and test fixtures that need byte-exact device messages.

use super::protocol::*;

/// Write a name into the fixed NUL-padded field, truncating if too long
fn push_name(buf: &mut Vec<u8>, name: &str) {
    let mut field = [0u8; NAME_FIELD_SIZE];
    let bytes = name.as_bytes();
    let len = bytes.len().min(NAME_FIELD_SIZE);
    field[..len].copy_from_slice(&bytes[..len]);
    buf.extend_from_slice(&field);
}

/// Encode a vehicle message (45 bytes)
///
/// # Arguments
///
/// * `vehicle` - Navigation payload
/// * `sequence` - Per-device message counter
///
/// # Examples
///
/// ```
/// use sailing_basestation::radio::encoder::encode_vehicle;
/// use sailing_basestation::radio::protocol::{VehiclePayload, VEHICLE_MESSAGE_SIZE};
///
/// let vehicle = VehiclePayload {
///     name: "FRA222".into(),
///     gps_timestamp: 0,
///     latitude: 43.1,
///     longitude: 2.6,
///     speed: 1.0,
///     heading: 90.0,
///     satellites: 7,
///     recording: false,
/// };
/// assert_eq!(encode_vehicle(&vehicle, 1).len(), VEHICLE_MESSAGE_SIZE);
/// ```
pub fn encode_vehicle(vehicle: &VehiclePayload, sequence: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(VEHICLE_MESSAGE_SIZE);
    buf.push(KIND_VEHICLE);
    push_name(&mut buf, &vehicle.name);
    buf.extend_from_slice(&sequence.to_le_bytes());
    buf.extend_from_slice(&vehicle.gps_timestamp.to_le_bytes());
    buf.extend_from_slice(&vehicle.latitude.to_le_bytes());
    buf.extend_from_slice(&vehicle.longitude.to_le_bytes());
    buf.extend_from_slice(&vehicle.speed.to_le_bytes());
    buf.extend_from_slice(&vehicle.heading.to_le_bytes());
    buf.push(vehicle.satellites);
    buf.push(vehicle.recording as u8);
    buf
}

/// Encode a wind beacon message (37 bytes)
///
/// A beacon without a direction reading is sent with a direction of 0°.
pub fn encode_beacon(beacon: &BeaconPayload, mac: &MacAddress, sequence: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(BEACON_MESSAGE_SIZE);
    buf.push(KIND_BEACON);
    push_name(&mut buf, &beacon.name);
    buf.extend_from_slice(mac);
    buf.extend_from_slice(&beacon.wind_speed.to_le_bytes());
    buf.extend_from_slice(&beacon.wind_direction.unwrap_or(0.0).to_le_bytes());
    buf.extend_from_slice(&sequence.to_le_bytes());
    buf
}

/// Encode a navigation buoy message (42 bytes)
pub fn encode_buoy(buoy: &BuoyPayload, sequence: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(BUOY_MESSAGE_SIZE);
    buf.push(KIND_BUOY);
    push_name(&mut buf, &buoy.name);
    buf.extend_from_slice(&sequence.to_le_bytes());
    buf.extend_from_slice(&buoy.latitude.to_le_bytes());
    buf.extend_from_slice(&buoy.longitude.to_le_bytes());
    buf.extend_from_slice(&buoy.heading.to_le_bytes());
    buf.extend_from_slice(&buoy.heading_command.to_le_bytes());
    buf.push(buoy.throttle_command as u8);
    buf.push(buoy.rudder_command as u8);
    buf.push(buoy.nav_mode);
    buf
}
