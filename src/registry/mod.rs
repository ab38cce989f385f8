//! # Device Registry Module
//!
//! Live state of every device heard on the radio link, one registry per
//! device kind.
//!
//! This module handles:
//! - Inserting and updating entries as messages arrive
//! - Inferring lost messages from sequence-number gaps
//! - Evicting devices that fall silent for longer than their timeout
//! - Round-robin selection for the presentation layer
//!
//! A registry has a single writer (the ingestion path). Readers receive
//! clones and must tolerate an entry disappearing between two calls.

pub mod wind;

use std::collections::HashMap;

/// Live state of one device
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceEntry<P> {
    /// Sender address, `AA:BB:CC:DD:EE:FF`
    pub identity: String,

    /// Latest payload received from the device
    pub payload: P,

    /// Sequence number of the latest message
    pub last_sequence: u32,

    /// Messages received since the device was (re)inserted
    pub received_count: u64,

    /// Messages inferred lost from sequence gaps
    pub lost_count: u64,

    /// Monotonic time of the first message, in milliseconds
    pub first_seen_ms: u64,

    /// Monotonic time of the latest message, in milliseconds
    pub last_update_ms: u64,
}

impl<P> DeviceEntry<P> {
    /// Percentage of messages lost since first sighting
    pub fn loss_percent(&self) -> f64 {
        let total = self.received_count + self.lost_count;
        if total == 0 {
            0.0
        } else {
            self.lost_count as f64 * 100.0 / total as f64
        }
    }

    /// Time between the first and the latest message, in milliseconds
    pub fn tracked_ms(&self) -> u64 {
        self.last_update_ms.saturating_sub(self.first_seen_ms)
    }

    /// Whether the entry is older than `timeout_ms` at `now_ms`
    pub fn is_expired(&self, now_ms: u64, timeout_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_update_ms) > timeout_ms
    }
}

/// What an upsert did to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// First sighting of the identity
    Inserted,
    /// Existing entry refreshed; `lost` messages were inferred from the gap
    Updated { lost: u64 },
}

/// Identity → entry map with a stable insertion order and a selection cursor
///
/// The map and the ordered identity list always hold the same set of
/// identities.
#[derive(Debug, Clone)]
pub struct DeviceRegistry<P> {
    entries: HashMap<String, DeviceEntry<P>>,
    order: Vec<String>,
    selected: usize,
}

impl<P> Default for DeviceRegistry<P> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
            selected: 0,
        }
    }
}

impl<P: Clone> DeviceRegistry<P> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh a device and account for lost messages
    ///
    /// # Arguments
    ///
    /// * `identity` - Sender address
    /// * `sequence` - Sequence number carried by the message
    /// * `payload` - Decoded payload, replaces the stored one
    /// * `now_ms` - Monotonic reception time
    ///
    /// # Returns
    ///
    /// * `Upsert` - Whether the device was new, and how many messages the gap implies were lost
    ///
    /// # Sequence Numbers
    ///
    /// The expected sequence is `last_sequence + 1` computed with wrapping
    /// arithmetic, so a counter rolling over from `u32::MAX` to `0` is not
    /// reported as loss. A gap that straddles the wrap point is not counted,
    /// and neither is a sequence that goes backwards (device reboot).
    pub fn upsert(&mut self, identity: &str, sequence: u32, payload: P, now_ms: u64) -> Upsert {
        match self.entries.get_mut(identity) {
            Some(entry) => {
                let expected = entry.last_sequence.wrapping_add(1);
                let lost = if sequence > expected {
                    (sequence - expected) as u64
                } else {
                    0
                };

                entry.lost_count += lost;
                entry.last_sequence = sequence;
                entry.received_count += 1;
                entry.last_update_ms = now_ms;
                entry.payload = payload;
                Upsert::Updated { lost }
            }
            None => {
                self.entries.insert(
                    identity.to_string(),
                    DeviceEntry {
                        identity: identity.to_string(),
                        payload,
                        last_sequence: sequence,
                        received_count: 1,
                        lost_count: 0,
                        first_seen_ms: now_ms,
                        last_update_ms: now_ms,
                    },
                );
                self.order.push(identity.to_string());
                Upsert::Inserted
            }
        }
    }

    /// Remove every device silent for longer than `timeout_ms`
    ///
    /// The selection cursor follows the selected device if it survives,
    /// otherwise it is clamped into range (or reset to 0 when empty).
    ///
    /// # Returns
    ///
    /// * `Vec<String>` - Identities that were evicted
    pub fn evict_expired(&mut self, now_ms: u64, timeout_ms: u64) -> Vec<String> {
        let evicted: Vec<String> = self
            .order
            .iter()
            .filter(|id| {
                self.entries
                    .get(id.as_str())
                    .map_or(true, |e| e.is_expired(now_ms, timeout_ms))
            })
            .cloned()
            .collect();

        if evicted.is_empty() {
            return evicted;
        }

        let selected_identity = self.order.get(self.selected).cloned();

        for id in &evicted {
            self.entries.remove(id);
        }
        let entries = &self.entries;
        self.order.retain(|id| entries.contains_key(id));

        self.selected = match selected_identity
            .and_then(|id| self.order.iter().position(|o| *o == id))
        {
            Some(index) => index,
            None if self.order.is_empty() => 0,
            None => self.selected.min(self.order.len() - 1),
        };

        evicted
    }

    /// Advance the selection cursor, wrapping at the end
    pub fn select_next(&mut self) {
        if self.order.is_empty() {
            return;
        }
        self.selected = (self.selected + 1) % self.order.len();
    }

    /// Current cursor position, always `< len()` unless empty
    pub fn selected_index(&self) -> usize {
        self.selected
    }

    /// Copy of the selected entry
    pub fn selected(&self) -> Option<DeviceEntry<P>> {
        self.order
            .get(self.selected)
            .and_then(|id| self.entries.get(id))
            .cloned()
    }

    /// Copy of an entry by identity
    pub fn get(&self, identity: &str) -> Option<DeviceEntry<P>> {
        self.entries.get(identity).cloned()
    }

    /// Whether an identity is tracked
    pub fn contains(&self, identity: &str) -> bool {
        self.entries.contains_key(identity)
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &DeviceEntry<P>> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    /// Identities in insertion order
    pub fn identities(&self) -> &[String] {
        &self.order
    }

    /// Number of tracked devices
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no device is tracked
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
