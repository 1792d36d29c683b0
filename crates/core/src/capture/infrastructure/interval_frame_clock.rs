use std::thread;
use std::time::{Duration, Instant};

use crate::capture::domain::frame_clock::FrameClock;
use crate::shared::constants::DEFAULT_REFRESH_HZ;

/// Smallest step between two reported timestamps, in milliseconds.
const MIN_STEP_MS: f64 = 0.001;

/// Ticks at a fixed rate measured from creation.
///
/// A tick that comes due late is delivered at once and the schedule
/// restarts from there, so a stalled loop does not burst to catch up.
pub struct IntervalFrameClock {
    origin: Instant,
    interval: Duration,
    next_due: Instant,
    last_ms: Option<f64>,
}

impl IntervalFrameClock {
    pub fn new(refresh_hz: f64) -> Self {
        let hz = if refresh_hz.is_finite() && refresh_hz > 0.0 {
            refresh_hz
        } else {
            DEFAULT_REFRESH_HZ
        };
        let origin = Instant::now();
        Self {
            origin,
            interval: Duration::from_secs_f64(1.0 / hz),
            next_due: origin,
            last_ms: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for IntervalFrameClock {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_HZ)
    }
}

impl FrameClock for IntervalFrameClock {
    fn next_tick(&mut self) -> f64 {
        let now = Instant::now();
        if self.next_due > now {
            thread::sleep(self.next_due - now);
        }
        self.next_due = (self.next_due + self.interval).max(Instant::now());

        let elapsed_ms = self.origin.elapsed().as_secs_f64() * 1000.0;
        let ms = match self.last_ms {
            Some(last) if elapsed_ms <= last => last + MIN_STEP_MS,
            _ => elapsed_ms,
        };
        self.last_ms = Some(ms);
        ms
    }
}
