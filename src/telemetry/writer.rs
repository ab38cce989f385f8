//! # Persistence Task
//!
//! Background loop that moves queued snapshots into the session log.
//!
//! Every `flush_interval` the task drains the [`HandoffQueue`], converts the
//! batch to [`LogRecord`]s against one wall-clock reading and appends it to
//! the [`JsonArrayLog`]. A failed batch is discarded, never retried: the
//! sticky failure flag is raised and the next cycle carries only new data.
//! The task never touches the device registries.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::clock::Clock;
use super::log_file::{AppendOutcome, JsonArrayLog};
use super::queue::HandoffQueue;
use super::record::{EpochReference, LogRecord};
use crate::error::{BaseStationError, Result};
use crate::station::StationStatus;

/// Result of one drain/append cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Queue was empty
    Idle,
    /// Batch of this many records committed
    Written(usize),
    /// Batch of this many records discarded after a failure
    Discarded(usize),
}

/// Periodic consumer of the handoff queue
pub struct PersistenceTask {
    queue: Arc<HandoffQueue>,
    status: Arc<StationStatus>,
    clock: Arc<dyn Clock>,
    log_dir: PathBuf,
    log: JsonArrayLog,
    period: Duration,
}

impl PersistenceTask {
    /// Create the task and fix this session's log path
    ///
    /// The file itself is created by the first non-empty batch.
    ///
    /// # Arguments
    ///
    /// * `queue` - Handoff queue filled by the ingestion path
    /// * `status` - Shared status flags
    /// * `clock` - Time source for session naming and epoch reconstruction
    /// * `log_dir` - Directory holding session logs
    /// * `period` - Interval between drain cycles
    pub fn new(
        queue: Arc<HandoffQueue>,
        status: Arc<StationStatus>,
        clock: Arc<dyn Clock>,
        log_dir: impl Into<PathBuf>,
        period: Duration,
    ) -> Self {
        let log_dir = log_dir.into();
        let path = session_path(&log_dir, clock.as_ref());
        info!("Session log: {}", path.display());

        Self {
            queue,
            status,
            clock,
            log_dir,
            log: JsonArrayLog::new(path),
            period,
        }
    }

    /// Path of this session's log file
    pub fn session_path(&self) -> &Path {
        self.log.path()
    }

    /// Drain the queue once and commit the batch
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let batch = self.queue.drain();
        if batch.is_empty() {
            return CycleOutcome::Idle;
        }
        let count = batch.len();

        if let Err(e) = self.ensure_storage() {
            warn!("Discarding {} records: {}", count, e);
            self.status.note_write_failure(count);
            return CycleOutcome::Discarded(count);
        }

        let reference = EpochReference::capture(self.clock.as_ref());
        if reference.is_none() {
            debug!("Wall clock not set; writing records without datetime");
        }
        let records: Vec<LogRecord> = batch
            .iter()
            .map(|entry| LogRecord::from_entry(entry, reference.as_ref()))
            .collect();

        let log = self.log.clone();
        let result = tokio::task::spawn_blocking(move || log.append(&records))
            .await
            .unwrap_or_else(|e| Err(BaseStationError::Io(std::io::Error::other(e))));

        match result {
            Ok(outcome) => {
                self.status
                    .note_write_success(count, outcome == AppendOutcome::Recreated);
                debug!("Wrote {} records to {} ({:?})", count, self.log.path().display(), outcome);
                CycleOutcome::Written(count)
            }
            Err(e) => {
                warn!("Discarding {} records, write to {} failed: {}", count, self.log.path().display(), e);
                self.status.note_write_failure(count);
                CycleOutcome::Discarded(count)
            }
        }
    }

    /// Run until `shutdown` turns true or its sender is dropped
    ///
    /// A final cycle runs on shutdown so queued records are not abandoned.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        info!("Persistence task started ({} ms period)", self.period.as_millis());

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        let outcome = self.run_cycle().await;
        let snapshot = self.status.snapshot();
        info!(
            "Persistence task stopped (final flush: {:?}, {} records written, {} discarded)",
            outcome, snapshot.records_written, snapshot.records_discarded
        );
    }

    /// Make sure the log directory exists
    fn ensure_storage(&self) -> Result<()> {
        std::fs::create_dir_all(&self.log_dir).map_err(|e| {
            BaseStationError::StorageUnavailable(format!("{}: {}", self.log_dir.display(), e))
        })
    }
}

/// Log path for a new session
///
/// `YYYY-MM-DD_HH-MM-SS.json` (UTC) when the wall clock is set, otherwise
/// `session_<pid>_<monotonic ms>.json`. A numeric suffix keeps the name
/// unique if a file of that name already exists.
pub fn session_path(log_dir: &Path, clock: &dyn Clock) -> PathBuf {
    let stem = match clock
        .wall_clock_epoch()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
    {
        Some(start) => start.format("%Y-%m-%d_%H-%M-%S").to_string(),
        None => format!(
            "session_{}_{}",
            std::process::id(),
            clock.now_monotonic_millis()
        ),
    };

    let mut path = log_dir.join(format!("{}.json", stem));
    let mut suffix = 1;
    while path.exists() {
        path = log_dir.join(format!("{}_{}.json", stem, suffix));
        suffix += 1;
    }
    path
}
