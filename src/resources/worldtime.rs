//! Frame timing shared with every hook.

use std::time::{Duration, Instant};

/// Delta/elapsed seconds and frame counter, updated once per frame.
#[derive(Debug, Clone, Copy)]
pub struct WorldTime {
    /// Scaled seconds since the loop started.
    pub elapsed: f32,
    /// Scaled seconds the previous frame took.
    pub delta: f32,
    pub time_scale: f32,
    pub frame_count: u64,
}

impl Default for WorldTime {
    fn default() -> Self {
        WorldTime {
            elapsed: 0.0,
            delta: 0.0,
            time_scale: 1.0,
            frame_count: 0,
        }
    }
}

impl WorldTime {
    pub fn with_time_scale(mut self, scale: f32) -> Self {
        self.time_scale = scale;
        self
    }

    /// Record a finished frame that took `dt` unscaled seconds.
    pub fn advance(&mut self, dt: f32) {
        let scaled_dt = dt * self.time_scale;
        self.elapsed += scaled_dt;
        self.delta = scaled_dt;
        self.frame_count += 1;
    }
}

/// Wall-clock stopwatch measuring the time between frame starts.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    last: Instant,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
        }
    }

    /// Time since the previous call (or construction), restarting the clock.
    pub fn restart(&mut self) -> Duration {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last);
        self.last = now;
        elapsed
    }
}
