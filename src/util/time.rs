//! Time utilities for game simulation

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Display refresh rate the simulation is paced at
pub const DEFAULT_TICK_RATE: u32 = 60;

/// Duration of one tick at the given rate
pub fn tick_period(tick_rate: u32) -> Duration {
    Duration::from_micros(1_000_000 / u64::from(tick_rate.max(1)))
}

/// Match clock. Runs on tokio's clock so paused-time tests can drive it.
#[derive(Debug, Clone)]
pub struct Timer {
    start: tokio::time::Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: tokio::time::Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
