//! Fixed-rate tick timing

use std::time::{Duration, Instant};

/// Fixed-rate clock for the simulation loop
///
/// Counts ticks and tells the host how long to wait before the next one.
/// Abilities that need elapsed time read [`TickClock::elapsed`] or keep their
/// own start instant; the scheduler never enforces durations.
pub struct TickClock {
    tick_duration: Duration,
    started: Instant,
    next_tick: Instant,
    tick: u64,
}

impl TickClock {
    /// Create a clock ticking `tick_rate` times per second
    pub fn new(tick_rate: u32) -> Self {
        let tick_duration = Duration::from_secs(1) / tick_rate.max(1);
        let now = Instant::now();
        Self {
            tick_duration,
            started: now,
            next_tick: now,
            tick: 0,
        }
    }

    /// Duration of a single tick
    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    /// Number of ticks advanced so far
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Time since the clock was created
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Advance one tick and return how long the caller should sleep before running it
    ///
    /// Returns `Duration::ZERO` when the loop is running behind.
    pub fn advance(&mut self) -> Duration {
        self.tick += 1;
        let now = Instant::now();
        let scheduled = self.next_tick.max(now);
        self.next_tick = scheduled + self.tick_duration;
        scheduled - now
    }
}
