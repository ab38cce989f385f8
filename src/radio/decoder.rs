//! # Radio Message Decoder
//!
//! Classifies raw radio messages into typed records.
//!
//! The decoder is a pure function of its inputs. Messages in a legacy
//! layout are mapped field by field into the current representation;
//! anything else is rejected with a [`DecodeError`] for the caller to count
//! and drop.

use super::protocol::*;
use crate::error::DecodeError;

/// Little-endian field reader over a message whose length is already checked
struct Fields<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Fields<'a> {
    /// Start reading just after the discriminant byte
    fn after_kind(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 1 }
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.bytes[self.offset..self.offset + N]);
        self.offset += N;
        out
    }

    fn u8(&mut self) -> u8 {
        self.take::<1>()[0]
    }

    fn i8(&mut self) -> i8 {
        self.u8() as i8
    }

    fn bool(&mut self) -> bool {
        self.u8() != 0
    }

    fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take())
    }

    fn f32(&mut self) -> f32 {
        f32::from_le_bytes(self.take())
    }

    fn mac(&mut self) -> MacAddress {
        self.take()
    }

    /// NUL-padded name field, decoded lossily
    fn name(&mut self) -> String {
        let raw = self.take::<NAME_FIELD_SIZE>();
        let end = raw.iter().position(|&b| b == 0).unwrap_or(NAME_FIELD_SIZE);
        String::from_utf8_lossy(&raw[..end]).into_owned()
    }
}

/// Decode a raw radio message
///
/// # Arguments
///
/// * `sender` - Link-layer address of the sending device
/// * `bytes` - Complete message, discriminant byte first
/// * `captured_at_ms` - Monotonic clock reading at reception
///
/// # Returns
///
/// * `Result<DecodedRecord, DecodeError>` - Typed record, or the reason the message was rejected
///
/// # Errors
///
/// Returns error if:
/// - The message is empty
/// - The discriminant byte is not a known device kind
/// - The length matches no current or legacy layout of that kind
///
/// # Examples
///
/// ```
/// use sailing_basestation::radio::decoder::decode_message;
/// use sailing_basestation::error::DecodeError;
///
/// let sender = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x01];
/// assert_eq!(
///     decode_message(&sender, &[1, 2, 3], 0),
///     Err(DecodeError::InvalidLength { kind: 1, len: 3 })
/// );
/// ```
pub fn decode_message(
    sender: &MacAddress,
    bytes: &[u8],
    captured_at_ms: u64,
) -> Result<DecodedRecord, DecodeError> {
    let discriminant = *bytes.first().ok_or(DecodeError::Empty)?;
    let kind = DeviceKind::from_discriminant(discriminant)
        .ok_or(DecodeError::UnknownKind(discriminant))?;
    let identity = format_mac(sender);

    let (sequence, payload) = match (kind, bytes.len()) {
        (DeviceKind::Vehicle, VEHICLE_MESSAGE_SIZE) => decode_vehicle(bytes),
        (DeviceKind::Vehicle, VEHICLE_LEGACY_MESSAGE_SIZE) => decode_vehicle_legacy(bytes, &identity),
        (DeviceKind::Beacon, BEACON_MESSAGE_SIZE) => decode_beacon(bytes),
        (DeviceKind::Beacon, BEACON_LEGACY_V2_MESSAGE_SIZE) => decode_beacon_legacy_v2(bytes),
        (DeviceKind::Beacon, BEACON_LEGACY_V1_MESSAGE_SIZE) => decode_beacon_legacy_v1(bytes),
        (DeviceKind::Buoy, BUOY_MESSAGE_SIZE) => decode_buoy(bytes),
        (_, len) => {
            return Err(DecodeError::InvalidLength {
                kind: discriminant,
                len,
            })
        }
    };

    Ok(DecodedRecord {
        identity,
        sequence,
        captured_at_ms,
        payload,
    })
}

fn decode_vehicle(bytes: &[u8]) -> (u32, DevicePayload) {
    let mut f = Fields::after_kind(bytes);
    let name = f.name();
    let sequence = f.u32();
    let payload = VehiclePayload {
        name,
        gps_timestamp: f.u32(),
        latitude: f.f32(),
        longitude: f.f32(),
        speed: f.f32(),
        heading: f.f32(),
        satellites: f.u8(),
        recording: f.bool(),
    };
    (sequence, DevicePayload::Vehicle(payload))
}

/// Legacy boats had no name field; they are known by their address
fn decode_vehicle_legacy(bytes: &[u8], identity: &str) -> (u32, DevicePayload) {
    let mut f = Fields::after_kind(bytes);
    let payload = VehiclePayload {
        name: identity.to_string(),
        gps_timestamp: f.u32(),
        latitude: f.f32(),
        longitude: f.f32(),
        speed: f.f32(),
        heading: f.f32(),
        satellites: f.u8(),
        recording: f.bool(),
    };
    (LEGACY_SEQUENCE, DevicePayload::Vehicle(payload))
}

fn decode_beacon(bytes: &[u8]) -> (u32, DevicePayload) {
    let mut f = Fields::after_kind(bytes);
    let name = f.name();
    let _mac = f.mac();
    let wind_speed = f.f32();
    let wind_direction = f.f32();
    let sequence = f.u32();
    let payload = BeaconPayload {
        name,
        wind_speed,
        wind_direction: Some(wind_direction),
    };
    (sequence, DevicePayload::Beacon(payload))
}

fn decode_beacon_legacy_v2(bytes: &[u8]) -> (u32, DevicePayload) {
    let mut f = Fields::after_kind(bytes);
    let name = f.name();
    let _mac = f.mac();
    let payload = BeaconPayload {
        name,
        wind_speed: f.f32(),
        wind_direction: None,
    };
    (LEGACY_SEQUENCE, DevicePayload::Beacon(payload))
}

fn decode_beacon_legacy_v1(bytes: &[u8]) -> (u32, DevicePayload) {
    let mut f = Fields::after_kind(bytes);
    let id = f.u32();
    let _mac = f.mac();
    let payload = BeaconPayload {
        name: format!("ANEMO-{}", id),
        wind_speed: f.f32(),
        wind_direction: None,
    };
    (LEGACY_SEQUENCE, DevicePayload::Beacon(payload))
}

fn decode_buoy(bytes: &[u8]) -> (u32, DevicePayload) {
    let mut f = Fields::after_kind(bytes);
    let name = f.name();
    let sequence = f.u32();
    let payload = BuoyPayload {
        name,
        latitude: f.f32(),
        longitude: f.f32(),
        heading: f.f32(),
        heading_command: f.f32(),
        throttle_command: f.i8(),
        rudder_command: f.i8(),
        nav_mode: f.u8(),
    };
    (sequence, DevicePayload::Buoy(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::encoder::{encode_beacon, encode_buoy, encode_vehicle};

    const SENDER: MacAddress = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x01];

    fn sample_vehicle() -> VehiclePayload {
        VehiclePayload {
            name: "FRA222".to_string(),
            gps_timestamp: 1_758_460_245,
            latitude: 43.123456,
            longitude: 2.654321,
            speed: 2.5,
            heading: 280.0,
            satellites: 8,
            recording: true,
        }
    }

    #[test]
    fn test_decode_empty_message() {
        assert_eq!(decode_message(&SENDER, &[], 0), Err(DecodeError::Empty));
    }

    #[test]
    fn test_decode_unknown_kind() {
        let bytes = [0x07u8; VEHICLE_MESSAGE_SIZE];
        assert_eq!(
            decode_message(&SENDER, &bytes, 0),
            Err(DecodeError::UnknownKind(0x07))
        );
    }

    #[test]
    fn test_decode_invalid_length() {
        let mut bytes = encode_vehicle(&sample_vehicle(), 1);
        bytes.pop();
        assert_eq!(
            decode_message(&SENDER, &bytes, 0),
            Err(DecodeError::InvalidLength {
                kind: KIND_VEHICLE,
                len: VEHICLE_MESSAGE_SIZE - 1
            })
        );
    }

    #[test]
    fn test_decode_vehicle() {
        let vehicle = sample_vehicle();
        let bytes = encode_vehicle(&vehicle, 42);
        let record = decode_message(&SENDER, &bytes, 1234).unwrap();

        assert_eq!(record.identity, "AA:BB:CC:DD:EE:01");
        assert_eq!(record.sequence, 42);
        assert_eq!(record.captured_at_ms, 1234);
        assert_eq!(record.kind(), DeviceKind::Vehicle);
        assert_eq!(record.payload, DevicePayload::Vehicle(vehicle));
    }

    #[test]
    fn test_decode_legacy_vehicle() {
        let mut bytes = vec![KIND_VEHICLE];
        bytes.extend_from_slice(&1_700_000_000u32.to_le_bytes());
        bytes.extend_from_slice(&43.5f32.to_le_bytes());
        bytes.extend_from_slice(&2.25f32.to_le_bytes());
        bytes.extend_from_slice(&1.5f32.to_le_bytes());
        bytes.extend_from_slice(&90.0f32.to_le_bytes());
        bytes.push(11);
        bytes.push(0);
        assert_eq!(bytes.len(), VEHICLE_LEGACY_MESSAGE_SIZE);

        let record = decode_message(&SENDER, &bytes, 0).unwrap();
        assert_eq!(record.sequence, LEGACY_SEQUENCE);
        match record.payload {
            DevicePayload::Vehicle(v) => {
                assert_eq!(v.name, "AA:BB:CC:DD:EE:01");
                assert_eq!(v.gps_timestamp, 1_700_000_000);
                assert_eq!(v.latitude, 43.5);
                assert_eq!(v.heading, 90.0);
                assert_eq!(v.satellites, 11);
                assert!(!v.recording);
            }
            other => panic!("Expected vehicle payload, got: {:?}", other),
        }
    }

    #[test]
    fn test_decode_beacon() {
        let beacon = BeaconPayload {
            name: "BUOY1".to_string(),
            wind_speed: 6.4,
            wind_direction: Some(315.0),
        };
        let bytes = encode_beacon(&beacon, &SENDER, 7);
        let record = decode_message(&SENDER, &bytes, 0).unwrap();
        assert_eq!(record.sequence, 7);
        assert_eq!(record.payload, DevicePayload::Beacon(beacon));
    }

    #[test]
    fn test_decode_legacy_beacon_with_string_id() {
        let mut bytes = vec![KIND_BEACON];
        let mut name = [0u8; NAME_FIELD_SIZE];
        name[..6].copy_from_slice(b"ANEMO1");
        bytes.extend_from_slice(&name);
        bytes.extend_from_slice(&SENDER);
        bytes.extend_from_slice(&12.5f32.to_le_bytes());
        assert_eq!(bytes.len(), BEACON_LEGACY_V2_MESSAGE_SIZE);

        let record = decode_message(&SENDER, &bytes, 0).unwrap();
        assert_eq!(
            record.payload,
            DevicePayload::Beacon(BeaconPayload {
                name: "ANEMO1".to_string(),
                wind_speed: 12.5,
                wind_direction: None,
            })
        );
    }

    #[test]
    fn test_decode_legacy_beacon_with_numeric_id() {
        let mut bytes = vec![KIND_BEACON];
        bytes.extend_from_slice(&17u32.to_le_bytes());
        bytes.extend_from_slice(&SENDER);
        bytes.extend_from_slice(&3.0f32.to_le_bytes());
        assert_eq!(bytes.len(), BEACON_LEGACY_V1_MESSAGE_SIZE);

        let record = decode_message(&SENDER, &bytes, 0).unwrap();
        assert_eq!(record.sequence, LEGACY_SEQUENCE);
        assert_eq!(record.payload.name(), "ANEMO-17");
    }

    #[test]
    fn test_decode_buoy() {
        let buoy = BuoyPayload {
            name: "MARK-A".to_string(),
            latitude: 43.2,
            longitude: 5.3,
            heading: 12.0,
            heading_command: 20.0,
            throttle_command: -40,
            rudder_command: 15,
            nav_mode: 2,
        };
        let bytes = encode_buoy(&buoy, 99);
        let record = decode_message(&SENDER, &bytes, 0).unwrap();
        assert_eq!(record.sequence, 99);
        assert_eq!(record.payload, DevicePayload::Buoy(buoy));
    }

    #[test]
    fn test_decode_name_without_terminator() {
        let mut vehicle = sample_vehicle();
        vehicle.name = "ABCDEFGHIJKLMNOPQR".to_string();
        let bytes = encode_vehicle(&vehicle, 1);
        let record = decode_message(&SENDER, &bytes, 0).unwrap();
        assert_eq!(record.payload.name(), "ABCDEFGHIJKLMNOPQR");
    }

    #[test]
    fn test_decode_buoy_length_is_not_accepted_as_beacon() {
        let mut bytes = vec![0u8; BUOY_MESSAGE_SIZE];
        bytes[0] = KIND_BEACON;
        assert!(matches!(
            decode_message(&SENDER, &bytes, 0),
            Err(DecodeError::InvalidLength { kind: KIND_BEACON, .. })
        ));
    }
}
