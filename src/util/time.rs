//! Time utilities for the simulation loop

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

/// Default tick rates
pub const SIMULATION_TPS: u32 = 10;
pub const BROADCAST_TPS: u32 = 5;

/// Period of a loop running `tps` times per second
pub fn tick_period(tps: u32) -> Duration {
    Duration::from_micros(1_000_000 / u64::from(tps.max(1)))
}

/// Measures wall time between ticks
#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_secs(&self) -> f32 {
        self.start.elapsed().as_secs_f32()
    }

    pub fn reset(&mut self) {
        self.start = Instant::now();
    }

    /// Seconds since the last lap, restarting the timer
    pub fn lap(&mut self) -> f32 {
        let dt = self.elapsed_secs();
        self.reset();
        dt
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn periods_match_rates() {
        assert_eq!(tick_period(SIMULATION_TPS), Duration::from_millis(100));
        assert_eq!(tick_period(BROADCAST_TPS), Duration::from_millis(200));
        assert_eq!(tick_period(0), Duration::from_secs(1));
    }

    #[test]
    fn timer_laps() {
        let mut timer = Timer::new();
        std::thread::sleep(Duration::from_millis(5));
        let dt = timer.lap();
        assert!(dt >= 0.005);
        assert!(timer.elapsed_secs() < dt);
    }
}
