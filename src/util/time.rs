//! Time utilities for game simulation

use std::time::{Duration, Instant};

/// Duration of one simulation tick at the given rate
pub fn tick_duration(simulation_tps: u32) -> Duration {
    Duration::from_micros(1_000_000 / simulation_tps as u64)
}

/// Delta time for one simulation tick (in seconds)
pub fn tick_delta(simulation_tps: u32) -> f32 {
    1.0 / simulation_tps as f32
}

/// How many simulation ticks pass between snapshot broadcasts
pub fn snapshot_interval_ticks(simulation_tps: u32, snapshot_tps: u32) -> u32 {
    (simulation_tps / snapshot_tps).max(1)
}

/// Monotonic clock owned by the simulation authority
///
/// All coyote-time and jump-buffer comparisons are made against this clock.
/// Wall-clock time is never consulted: it can jump, and replaying a session
/// against recorded timestamps must stay meaningful.
#[derive(Debug, Clone)]
pub struct SimClock {
    origin: Instant,
}

impl SimClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Seconds elapsed since the clock was created
    pub fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_duration_matches_rate() {
        assert_eq!(tick_duration(60), Duration::from_micros(16_666));
        assert_eq!(tick_duration(50), Duration::from_millis(20));
    }

    #[test]
    fn snapshot_interval_never_zero() {
        assert_eq!(snapshot_interval_ticks(60, 20), 3);
        assert_eq!(snapshot_interval_ticks(30, 30), 1);
        assert_eq!(snapshot_interval_ticks(30, 45), 1);
    }

    #[test]
    fn clock_is_monotonic() {
        let clock = SimClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
