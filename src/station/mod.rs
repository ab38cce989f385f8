//! # Base Station Module
//!
//! Ingestion entry point and presentation/control surface.
//!
//! [`BaseStation`] owns the three device registries and is driven by a
//! single task: every radio message goes through [`BaseStation::on_message`],
//! which never blocks and never fails. Snapshots for the log leave through
//! the [`HandoffQueue`]; health flags are shared through [`StationStatus`].

pub mod status;

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::RegistryConfig;
use crate::error::DecodeError;
use crate::radio::decoder::decode_message;
use crate::radio::protocol::{
    BeaconPayload, BuoyPayload, DeviceKind, DevicePayload, MacAddress, VehiclePayload,
};
use crate::registry::wind::active_wind_direction;
use crate::registry::{DeviceEntry, DeviceRegistry, Upsert};
use crate::telemetry::clock::Clock;
use crate::telemetry::queue::{Enqueue, HandoffQueue};
use crate::telemetry::record::StorageEntry;
pub use status::{StationStatus, StatusSnapshot};

/// Copy of the selected vehicle handed to the presentation layer
pub type VehicleSnapshot = DeviceEntry<VehiclePayload>;

/// Per-kind silence timeouts in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub vehicle_ms: u64,
    pub beacon_ms: u64,
    pub buoy_ms: u64,
}

impl Timeouts {
    /// Timeout for a device kind
    pub fn for_kind(&self, kind: DeviceKind) -> u64 {
        match kind {
            DeviceKind::Vehicle => self.vehicle_ms,
            DeviceKind::Beacon => self.beacon_ms,
            DeviceKind::Buoy => self.buoy_ms,
        }
    }
}

impl From<&RegistryConfig> for Timeouts {
    fn from(config: &RegistryConfig) -> Self {
        Self {
            vehicle_ms: config.vehicle_timeout_ms,
            beacon_ms: config.beacon_timeout_ms,
            buoy_ms: config.buoy_timeout_ms,
        }
    }
}

/// What happened to one radio message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingest {
    /// Decoder rejected the message
    Rejected(DecodeError),
    /// Message applied to the registry of its kind
    Accepted {
        kind: DeviceKind,
        upsert: Upsert,
        /// `None` when recording is off
        queued: Option<Enqueue>,
    },
}

/// Live fleet state and the ingestion path
pub struct BaseStation {
    vehicles: DeviceRegistry<VehiclePayload>,
    beacons: DeviceRegistry<BeaconPayload>,
    buoys: DeviceRegistry<BuoyPayload>,
    timeouts: Timeouts,
    queue: Arc<HandoffQueue>,
    status: Arc<StationStatus>,
    clock: Arc<dyn Clock>,
}

impl BaseStation {
    /// Create a station with empty registries
    ///
    /// # Arguments
    ///
    /// * `timeouts` - Silence timeouts per device kind
    /// * `queue` - Handoff queue shared with the persistence task
    /// * `status` - Status flags shared with the persistence task and presentation
    /// * `clock` - Monotonic time source for reception timestamps
    pub fn new(
        timeouts: Timeouts,
        queue: Arc<HandoffQueue>,
        status: Arc<StationStatus>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            vehicles: DeviceRegistry::new(),
            beacons: DeviceRegistry::new(),
            buoys: DeviceRegistry::new(),
            timeouts,
            queue,
            status,
            clock,
        }
    }

    /// Ingest one radio message
    ///
    /// Decodes, evicts silent devices, updates the registry of the message's
    /// kind and, while recording, queues a snapshot for the log. Rejected
    /// messages are counted and dropped.
    pub fn on_message(&mut self, sender: &MacAddress, bytes: &[u8]) -> Ingest {
        let now = self.clock.now_monotonic_millis();

        let record = match decode_message(sender, bytes, now) {
            Ok(record) => record,
            Err(e) => {
                self.status.note_malformed();
                debug!("Dropping {} byte message: {}", bytes.len(), e);
                return Ingest::Rejected(e);
            }
        };

        self.evict_expired_at(now);

        let kind = record.kind();
        let snapshot = self.status.is_recording().then(|| record.payload.clone());
        let upsert = match record.payload {
            DevicePayload::Vehicle(p) => self.vehicles.upsert(&record.identity, record.sequence, p, now),
            DevicePayload::Beacon(p) => self.beacons.upsert(&record.identity, record.sequence, p, now),
            DevicePayload::Buoy(p) => self.buoys.upsert(&record.identity, record.sequence, p, now),
        };

        match upsert {
            Upsert::Inserted => info!("New {} {} (seq {})", kind, record.identity, record.sequence),
            Upsert::Updated { lost } if lost > 0 => {
                debug!("{} {}: {} messages lost before seq {}", kind, record.identity, lost, record.sequence)
            }
            Upsert::Updated { .. } => {}
        }

        let queued = snapshot.map(|payload| {
            let entry = StorageEntry {
                captured_at_ms: now,
                identity: record.identity,
                sequence: record.sequence,
                payload,
                wind_direction: active_wind_direction(&self.beacons, now, self.timeouts.beacon_ms),
            };
            let outcome = self.queue.enqueue(entry);
            if outcome == Enqueue::Dropped {
                debug!("Handoff queue busy; dropped {} snapshot", kind);
            }
            outcome
        });

        Ingest::Accepted {
            kind,
            upsert,
            queued,
        }
    }

    /// Evict devices silent for longer than their kind's timeout
    pub fn evict_expired(&mut self) {
        let now = self.clock.now_monotonic_millis();
        self.evict_expired_at(now);
    }

    fn evict_expired_at(&mut self, now: u64) {
        let evicted = [
            (DeviceKind::Vehicle, self.vehicles.evict_expired(now, self.timeouts.vehicle_ms)),
            (DeviceKind::Beacon, self.beacons.evict_expired(now, self.timeouts.beacon_ms)),
            (DeviceKind::Buoy, self.buoys.evict_expired(now, self.timeouts.buoy_ms)),
        ];
        for (kind, identities) in evicted {
            for identity in identities {
                info!("{} {} timed out", kind, identity);
            }
        }
    }

    /// Copy of the selected vehicle
    ///
    /// Silent devices are evicted first, so a timed-out selection moves on
    /// to the next active vehicle instead of reading as empty.
    pub fn current_selected_device(&mut self) -> Option<VehicleSnapshot> {
        self.evict_expired();
        self.vehicles.selected()
    }

    /// Advance the vehicle selection, skipping devices that already timed out
    pub fn select_next_device(&mut self) {
        self.evict_expired();
        self.vehicles.select_next();
    }

    /// Number of active devices across all kinds
    pub fn device_count(&self) -> usize {
        [DeviceKind::Vehicle, DeviceKind::Beacon, DeviceKind::Buoy]
            .into_iter()
            .map(|kind| self.count_of(kind))
            .sum()
    }

    /// Number of active devices of one kind
    pub fn count_of(&self, kind: DeviceKind) -> usize {
        let now = self.clock.now_monotonic_millis();
        let timeout = self.timeouts.for_kind(kind);
        match kind {
            DeviceKind::Vehicle => self.vehicles.iter().filter(|e| !e.is_expired(now, timeout)).count(),
            DeviceKind::Beacon => self.beacons.iter().filter(|e| !e.is_expired(now, timeout)).count(),
            DeviceKind::Buoy => self.buoys.iter().filter(|e| !e.is_expired(now, timeout)).count(),
        }
    }

    /// Circular mean of the active beacons' wind directions
    pub fn wind_direction(&self) -> Option<f64> {
        let now = self.clock.now_monotonic_millis();
        active_wind_direction(&self.beacons, now, self.timeouts.beacon_ms)
    }

    /// Sticky flag: the latest log write failed
    pub fn last_write_had_error(&self) -> bool {
        self.status.last_write_failed()
    }

    /// Flip recording on or off, returning the new state
    pub fn toggle_recording(&self) -> bool {
        let recording = self.status.toggle_recording();
        info!("Recording {}", if recording { "started" } else { "stopped" });
        recording
    }

    /// Whether messages are being queued for the log
    pub fn is_recording(&self) -> bool {
        self.status.is_recording()
    }

    /// Read-only view of the vehicle registry
    pub fn vehicles(&self) -> &DeviceRegistry<VehiclePayload> {
        &self.vehicles
    }

    /// Read-only view of the beacon registry
    pub fn beacons(&self) -> &DeviceRegistry<BeaconPayload> {
        &self.beacons
    }

    /// Read-only view of the buoy registry
    pub fn buoys(&self) -> &DeviceRegistry<BuoyPayload> {
        &self.buoys
    }

    /// Shared status flags
    pub fn status(&self) -> &Arc<StationStatus> {
        &self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::encoder::{encode_beacon, encode_buoy, encode_vehicle};
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Clock the test advances by hand
    #[derive(Default)]
    struct ManualClock(AtomicU64);

    impl ManualClock {
        fn set(&self, ms: u64) {
            self.0.store(ms, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_monotonic_millis(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }

        fn wall_clock_epoch(&self) -> Option<i64> {
            None
        }
    }

    const BOAT: MacAddress = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x01];
    const BOAT2: MacAddress = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x03];
    const ANEMO_A: MacAddress = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x10];
    const ANEMO_B: MacAddress = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x11];
    const MARK: MacAddress = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x20];

    const TIMEOUTS: Timeouts = Timeouts {
        vehicle_ms: 10_000,
        beacon_ms: 30_000,
        buoy_ms: 10_000,
    };

    fn station(recording: bool) -> (BaseStation, Arc<HandoffQueue>, Arc<ManualClock>) {
        let queue = Arc::new(HandoffQueue::new());
        let clock = Arc::new(ManualClock::default());
        let station = BaseStation::new(
            TIMEOUTS,
            Arc::clone(&queue),
            Arc::new(StationStatus::new(recording)),
            clock.clone(),
        );
        (station, queue, clock)
    }

    fn vehicle(name: &str) -> VehiclePayload {
        VehiclePayload {
            name: name.to_string(),
            gps_timestamp: 1_758_460_245,
            latitude: 43.123456,
            longitude: 2.654321,
            speed: 2.5,
            heading: 280.0,
            satellites: 8,
            recording: false,
        }
    }

    fn beacon(direction: f32) -> BeaconPayload {
        BeaconPayload {
            name: "ANEMO".to_string(),
            wind_speed: 5.0,
            wind_direction: Some(direction),
        }
    }

    #[test]
    fn test_decoded_payload_is_stored_exactly() {
        let (mut station, _, _) = station(false);
        let payload = vehicle("FRA222");

        let outcome = station.on_message(&BOAT, &encode_vehicle(&payload, 1));
        assert_eq!(
            outcome,
            Ingest::Accepted {
                kind: DeviceKind::Vehicle,
                upsert: Upsert::Inserted,
                queued: None
            }
        );

        let entry = station.current_selected_device().unwrap();
        assert_eq!(entry.identity, "AA:BB:CC:DD:EE:01");
        assert_eq!(entry.payload, payload);
        assert_eq!(station.device_count(), 1);
    }

    #[test]
    fn test_malformed_message_is_counted_and_dropped() {
        let (mut station, queue, _) = station(true);

        let outcome = station.on_message(&BOAT, &[1, 2, 3]);
        assert!(matches!(outcome, Ingest::Rejected(DecodeError::InvalidLength { .. })));
        assert_eq!(station.on_message(&BOAT, &[]), Ingest::Rejected(DecodeError::Empty));

        assert_eq!(station.device_count(), 0);
        assert!(queue.is_empty());
        assert_eq!(station.status().snapshot().malformed_messages, 2);
    }

    #[test]
    fn test_loss_accounting_through_ingestion() {
        let (mut station, _, clock) = station(false);
        for (i, seq) in [1u32, 2, 3, 6, 7].into_iter().enumerate() {
            clock.set(i as u64 * 100);
            station.on_message(&BOAT, &encode_vehicle(&vehicle("FRA222"), seq));
        }

        let entry = station.current_selected_device().unwrap();
        assert_eq!(entry.lost_count, 2);
        assert_eq!(entry.received_count, 5);
    }

    #[test]
    fn test_device_reappearing_after_timeout_is_new() {
        let (mut station, _, clock) = station(false);
        let payload = vehicle("FRA222");
        for seq in 1..=5u32 {
            clock.set(seq as u64 * 1_000);
            station.on_message(&BOAT, &encode_vehicle(&payload, seq));
        }

        clock.set(5_000 + TIMEOUTS.vehicle_ms + 1);
        assert!(station.current_selected_device().is_none());
        assert_eq!(station.device_count(), 0);
        station.evict_expired();
        assert!(station.vehicles().is_empty());

        let outcome = station.on_message(&BOAT, &encode_vehicle(&payload, 100));
        assert!(matches!(
            outcome,
            Ingest::Accepted { upsert: Upsert::Inserted, .. }
        ));
        let entry = station.current_selected_device().unwrap();
        assert_eq!(entry.last_sequence, 100);
        assert_eq!(entry.lost_count, 0);
    }

    #[test]
    fn test_reappearing_device_is_evicted_lazily_on_next_message() {
        let (mut station, _, clock) = station(false);
        station.on_message(&BOAT, &encode_vehicle(&vehicle("FRA222"), 5));

        clock.set(TIMEOUTS.vehicle_ms + 1);
        let outcome = station.on_message(&BOAT, &encode_vehicle(&vehicle("FRA222"), 100));

        assert!(matches!(outcome, Ingest::Accepted { upsert: Upsert::Inserted, .. }));
        assert_eq!(station.vehicles().get("AA:BB:CC:DD:EE:01").unwrap().lost_count, 0);
    }

    #[test]
    fn test_select_next_device_cycles_vehicles() {
        let (mut station, _, _) = station(false);
        station.on_message(&BOAT, &encode_vehicle(&vehicle("ONE"), 1));
        station.on_message(&BOAT2, &encode_vehicle(&vehicle("TWO"), 1));
        station.on_message(&MARK, &encode_buoy(
            &BuoyPayload {
                name: "MARK".to_string(),
                latitude: 0.0,
                longitude: 0.0,
                heading: 0.0,
                heading_command: 0.0,
                throttle_command: 0,
                rudder_command: 0,
                nav_mode: 0,
            },
            1,
        ));

        assert_eq!(station.current_selected_device().unwrap().payload.name, "ONE");
        station.select_next_device();
        assert_eq!(station.current_selected_device().unwrap().payload.name, "TWO");
        station.select_next_device();
        assert_eq!(station.current_selected_device().unwrap().payload.name, "ONE");

        assert_eq!(station.count_of(DeviceKind::Vehicle), 2);
        assert_eq!(station.count_of(DeviceKind::Buoy), 1);
        assert_eq!(station.device_count(), 3);
    }

    #[test]
    fn test_expired_selection_moves_to_active_vehicle() {
        let (mut station, _, clock) = station(false);
        station.on_message(&BOAT, &encode_vehicle(&vehicle("ONE"), 1));
        clock.set(5_000);
        station.on_message(&BOAT2, &encode_vehicle(&vehicle("TWO"), 1));
        assert_eq!(station.current_selected_device().unwrap().payload.name, "ONE");

        // ONE is past its timeout, TWO is not
        clock.set(TIMEOUTS.vehicle_ms + 1);
        assert_eq!(station.count_of(DeviceKind::Vehicle), 1);
        let selected = station.current_selected_device().unwrap();
        assert_eq!(selected.payload.name, "TWO");
        assert_eq!(station.vehicles().len(), 1);
    }

    #[test]
    fn test_recording_queues_snapshots_with_wind() {
        let (mut station, queue, clock) = station(false);
        station.on_message(&ANEMO_A, &encode_beacon(&beacon(350.0), &ANEMO_A, 1));
        assert!(queue.is_empty(), "Nothing is queued while not recording");

        assert!(station.toggle_recording());
        clock.set(500);
        station.on_message(&ANEMO_B, &encode_beacon(&beacon(10.0), &ANEMO_B, 1));
        clock.set(1_000);
        let outcome = station.on_message(&BOAT, &encode_vehicle(&vehicle("FRA222"), 1));
        assert!(matches!(outcome, Ingest::Accepted { queued: Some(Enqueue::Queued), .. }));

        let batch = queue.drain();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].captured_at_ms, 500);
        assert_eq!(batch[0].payload.kind(), DeviceKind::Beacon);
        assert_eq!(batch[1].identity, "AA:BB:CC:DD:EE:01");
        assert_eq!(batch[1].sequence, 1);

        let wind = batch[1].wind_direction.unwrap();
        assert!(wind < 1e-3 || wind > 360.0 - 1e-3, "got {}", wind);
        let wind = station.wind_direction().unwrap();
        assert!(wind < 1e-3 || wind > 360.0 - 1e-3, "got {}", wind);

        assert!(!station.toggle_recording());
        station.on_message(&BOAT, &encode_vehicle(&vehicle("FRA222"), 2));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_ingestion_does_not_block_on_held_queue() {
        let (mut station, queue, _) = station(true);

        let outcome = {
            let _held = queue.hold_lock();
            station.on_message(&BOAT, &encode_vehicle(&vehicle("FRA222"), 1))
        };

        assert!(matches!(outcome, Ingest::Accepted { queued: Some(Enqueue::Dropped), .. }));
        assert_eq!(queue.dropped(), 1);
        assert_eq!(station.device_count(), 1, "Registry is updated even when the snapshot is dropped");
    }

    #[test]
    fn test_last_write_error_reflects_status() {
        let (station, _, _) = station(true);
        assert!(!station.last_write_had_error());
        station.status().note_write_failure(1);
        assert!(station.last_write_had_error());
    }
}
