//! # Station Status
//!
//! Flags and counters shared between the ingestion path, the persistence
//! task and the presentation layer. Every field is an atomic with a single
//! writing context; readers may observe slightly stale values.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Shared health flags and counters
#[derive(Debug, Default)]
pub struct StationStatus {
    recording: AtomicBool,
    last_write_failed: AtomicBool,
    malformed_messages: AtomicU64,
    records_written: AtomicU64,
    records_discarded: AtomicU64,
    batches_written: AtomicU64,
    log_recreations: AtomicU64,
}

/// Copy of every status field at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusSnapshot {
    pub recording: bool,
    pub last_write_failed: bool,
    pub malformed_messages: u64,
    pub records_written: u64,
    pub records_discarded: u64,
    pub batches_written: u64,
    pub log_recreations: u64,
}

impl StationStatus {
    /// Status with recording initially on or off
    pub fn new(recording: bool) -> Self {
        Self {
            recording: AtomicBool::new(recording),
            ..Self::default()
        }
    }

    /// Whether ingested messages are queued for the log
    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::Relaxed)
    }

    /// Flip recording, returning the new state
    pub fn toggle_recording(&self) -> bool {
        !self.recording.fetch_xor(true, Ordering::Relaxed)
    }

    /// Sticky flag: the latest persistence attempt failed
    pub fn last_write_failed(&self) -> bool {
        self.last_write_failed.load(Ordering::Relaxed)
    }

    /// Count a message the decoder rejected
    pub fn note_malformed(&self) {
        self.malformed_messages.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a committed batch; clears the sticky failure flag
    pub fn note_write_success(&self, records: usize, recreated: bool) {
        self.records_written.fetch_add(records as u64, Ordering::Relaxed);
        self.batches_written.fetch_add(1, Ordering::Relaxed);
        if recreated {
            self.log_recreations.fetch_add(1, Ordering::Relaxed);
        }
        self.last_write_failed.store(false, Ordering::Relaxed);
    }

    /// Record a discarded batch; sets the sticky failure flag
    pub fn note_write_failure(&self, records: usize) {
        self.records_discarded.fetch_add(records as u64, Ordering::Relaxed);
        self.last_write_failed.store(true, Ordering::Relaxed);
    }

    /// Copy all fields
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            recording: self.is_recording(),
            last_write_failed: self.last_write_failed(),
            malformed_messages: self.malformed_messages.load(Ordering::Relaxed),
            records_written: self.records_written.load(Ordering::Relaxed),
            records_discarded: self.records_discarded.load(Ordering::Relaxed),
            batches_written: self.batches_written.load(Ordering::Relaxed),
            log_recreations: self.log_recreations.load(Ordering::Relaxed),
        }
    }
}
