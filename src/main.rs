//! # Sailing Base Station
//!
//! Shore-side receiver for RC sailing vehicles, wind beacons and buoys.
//!
//! This application reads radio messages from a USB bridge, keeps the live
//! fleet state and records the session to a JSON log.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use sailing_basestation::config::Config;
use sailing_basestation::error::BaseStationError;
use sailing_basestation::link::{BridgeLink, RawMessage};
use sailing_basestation::station::{BaseStation, StationStatus, Timeouts};
use sailing_basestation::telemetry::{Clock, HandoffQueue, PersistenceTask, SystemClock};

/// Operator commands read from stdin, one per line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    ToggleRecording,
    NextDevice,
    Status,
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "r" => Some(Command::ToggleRecording),
            "n" => Some(Command::NextDevice),
            "s" => Some(Command::Status),
            _ => None,
        }
    }
}

/// Main entry point for the base station
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber
///    - Load configuration (first argument, or defaults)
///    - Spawn the persistence task
///
/// 2. **Main Loop**
///    - Open the radio bridge, retrying every `reconnect_interval_ms`
///    - Feed every bridge message into the station
///    - Handle operator commands from stdin
///    - Log a status line every `report_interval_ms`
///
/// 3. **Graceful Shutdown**
///    - On Ctrl+C signal the persistence task
///    - Wait for its final flush
///
/// # Errors
///
/// Returns error if the configuration cannot be loaded
///
/// # Examples
///
/// ```bash
/// cargo run --release -- config/default.toml
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let (writer, _log_guard) = tracing_appender::non_blocking(std::io::stdout());
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
        )
        .init();

    info!("Sailing base station v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading configuration from {}", path);
            Config::load(&path)?
        }
        None => {
            info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let queue = Arc::new(HandoffQueue::new());
    let status = Arc::new(StationStatus::new(config.recording.enabled_at_start));

    let mut station = BaseStation::new(
        Timeouts::from(&config.registry),
        Arc::clone(&queue),
        Arc::clone(&status),
        Arc::clone(&clock),
    );

    let persistence = PersistenceTask::new(
        queue,
        Arc::clone(&status),
        clock,
        &config.recording.log_dir,
        Duration::from_millis(config.recording.flush_interval_ms),
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let persistence_handle = tokio::spawn(persistence.run(shutdown_rx));

    let mut link: Option<BridgeLink> = None;
    let mut reconnect = interval(Duration::from_millis(config.link.reconnect_interval_ms));
    reconnect.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut report = interval(Duration::from_millis(config.status.report_interval_ms));
    report.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut commands = spawn_stdin_reader();
    let mut stdin_open = true;

    info!(
        "Recording {} (press r + Enter to toggle, n for next device, s for status)",
        on_off(station.is_recording())
    );
    info!("Press Ctrl+C to exit");

    // Main loop
    loop {
        tokio::select! {
            message = next_link_message(&mut link) => {
                match message {
                    Ok(Some(message)) => {
                        station.on_message(&message.sender, &message.bytes);
                    }
                    Ok(None) => {
                        warn!("Radio bridge closed the stream");
                        link = None;
                    }
                    Err(e) => {
                        warn!("Radio bridge read failed: {}", e);
                        link = None;
                    }
                }
            }

            _ = reconnect.tick(), if link.is_none() => {
                match BridgeLink::open(&config.link.port, config.link.baud_rate) {
                    Ok(opened) => {
                        info!("Radio bridge connected at {}", opened.device_path());
                        link = Some(opened);
                    }
                    Err(e) => debug!("Radio bridge unavailable: {}", e),
                }
            }

            line = commands.recv(), if stdin_open => {
                match line {
                    Some(line) => match Command::parse(&line) {
                        Some(command) => handle_command(command, &mut station, rejected_frames(&link)),
                        None if line.trim().is_empty() => {}
                        None => warn!("Unknown command {:?} (r, n or s)", line.trim()),
                    },
                    None => {
                        debug!("stdin closed; operator commands disabled");
                        stdin_open = false;
                    }
                }
            }

            _ = report.tick() => {
                info!("{}", status_line(&mut station, rejected_frames(&link)));
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    // Receiver lives until the task returns
    let _ = shutdown_tx.send(true);
    persistence_handle.await?;

    let snapshot = status.snapshot();
    info!(
        "Session closed: {} records written, {} discarded, {} malformed messages",
        snapshot.records_written, snapshot.records_discarded, snapshot.malformed_messages
    );

    Ok(())
}

/// Next message from the bridge, or never while disconnected
async fn next_link_message(
    link: &mut Option<BridgeLink>,
) -> std::result::Result<Option<RawMessage>, BaseStationError> {
    match link {
        Some(link) => link.next_message().await,
        None => std::future::pending().await,
    }
}

/// Corrupt frames skipped by the bridge link, 0 while disconnected
fn rejected_frames(link: &Option<BridgeLink>) -> u64 {
    link.as_ref().map_or(0, BridgeLink::rejected_frames)
}

/// Forward stdin lines from a dedicated thread
///
/// A blocking reader on the runtime would keep it alive after Ctrl+C; the
/// detached thread ends with the process.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Apply an operator command
fn handle_command(command: Command, station: &mut BaseStation, rejected_frames: u64) {
    match command {
        Command::ToggleRecording => {
            station.toggle_recording();
        }
        Command::NextDevice => {
            station.select_next_device();
            match station.current_selected_device() {
                Some(vehicle) => info!(
                    "Selected {} ({}) {:.6},{:.6} {:.1} kn hdg {:.0} sats {} loss {:.1}% over {} s",
                    vehicle.payload.name,
                    vehicle.identity,
                    vehicle.payload.latitude,
                    vehicle.payload.longitude,
                    vehicle.payload.speed_knots(),
                    vehicle.payload.heading,
                    vehicle.payload.satellites,
                    vehicle.loss_percent(),
                    vehicle.tracked_ms() / 1000
                ),
                None => info!("No vehicle to select"),
            }
        }
        Command::Status => info!("{}", status_line(station, rejected_frames)),
    }
}

/// One-line summary of the station state
///
/// `rejected_frames` counts corrupt bridge frames on the current connection.
fn status_line(station: &mut BaseStation, rejected_frames: u64) -> String {
    use sailing_basestation::radio::protocol::DeviceKind;

    let wind = match station.wind_direction() {
        // 359.6 rounds to 0, not 360
        Some(direction) => format!("{}°", (direction.round() as u32) % 360),
        None => "--".to_string(),
    };
    let selected = match station.current_selected_device() {
        Some(vehicle) => vehicle.payload.name,
        None => "-".to_string(),
    };

    format!(
        "devices {} (vehicles {}, beacons {}, buoys {}) | selected {} | wind {} | bad frames {} | recording {}{}",
        station.device_count(),
        station.count_of(DeviceKind::Vehicle),
        station.count_of(DeviceKind::Beacon),
        station.count_of(DeviceKind::Buoy),
        selected,
        wind,
        rejected_frames,
        on_off(station.is_recording()),
        if station.last_write_had_error() { " | LOG WRITE ERROR" } else { "" }
    )
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}
