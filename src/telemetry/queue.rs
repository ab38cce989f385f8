//! # Handoff Queue
//!
//! Moves [`StorageEntry`] snapshots from the ingestion path to the
//! persistence task.
//!
//! The producer never waits: it makes one `try_lock` attempt and drops the
//! entry if the consumer is holding the lock. The consumer takes the whole
//! buffer in one swap, so the lock is only held for the duration of a
//! pointer exchange.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, TryLockError};

use super::record::StorageEntry;

/// Outcome of a producer-side enqueue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueue {
    /// Entry appended to the buffer
    Queued,
    /// Lock was contended; entry dropped
    Dropped,
}

/// Try-lock guarded buffer shared by one producer and one consumer
#[derive(Debug, Default)]
pub struct HandoffQueue {
    buffer: Mutex<Vec<StorageEntry>>,
    dropped: AtomicU64,
}

impl HandoffQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry without blocking
    ///
    /// Called from the ingestion path. If the lock is held the entry is
    /// dropped and the drop counter incremented.
    pub fn enqueue(&self, entry: StorageEntry) -> Enqueue {
        let mut buffer = match self.buffer.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return Enqueue::Dropped;
            }
        };
        buffer.push(entry);
        Enqueue::Queued
    }

    /// Take every buffered entry, in arrival order
    ///
    /// Called from the persistence task; waits for the lock.
    pub fn drain(&self) -> Vec<StorageEntry> {
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *buffer)
    }

    /// Entries dropped because the lock was contended
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Entries currently buffered (waits for the lock)
    pub fn len(&self) -> usize {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the buffer is empty (waits for the lock)
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    pub(crate) fn hold_lock(&self) -> std::sync::MutexGuard<'_, Vec<StorageEntry>> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
