//! # Telemetry Module
//!
//! Persists received device snapshots to a per-session JSON array log.
//!
//! This module handles:
//! - Handing snapshots from the ingestion path to the writer without blocking
//! - Converting monotonic capture times to wall-clock seconds
//! - Appending batches to the session log in place
//! - Recovering from a corrupt log file

pub mod clock;
pub mod log_file;
pub mod queue;
pub mod record;
pub mod writer;

pub use clock::{Clock, SystemClock};
pub use log_file::{AppendOutcome, JsonArrayLog};
pub use queue::{Enqueue, HandoffQueue};
pub use record::{EpochReference, LogRecord, StorageEntry};
pub use writer::{CycleOutcome, PersistenceTask};
