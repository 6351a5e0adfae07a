use std::time::Instant;

/// Monotonic frame clock - tracks delta time between ticks
#[derive(Debug)]
pub struct Clock {
    last_tick: Instant,
}

impl Clock {
    /// Create new clock starting now
    pub fn new() -> Self {
        Self {
            last_tick: Instant::now(),
        }
    }

    /// Get delta time since last tick and advance clock.
    /// Returns seconds, never negative; two ticks may tie at zero.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let delta = now.saturating_duration_since(self.last_tick).as_secs_f32();
        self.last_tick = now;
        delta.max(0.0)
    }

    /// Reset clock to current time
    pub fn reset(&mut self) {
        self.last_tick = Instant::now();
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts frames and reports the rate once per interval
#[derive(Debug, Clone, Copy)]
pub struct FpsCounter {
    interval: f32,
    frames: u32,
    elapsed: f32,
}

impl FpsCounter {
    pub fn new(interval: f32) -> Self {
        Self {
            interval,
            frames: 0,
            elapsed: 0.0,
        }
    }

    /// Record one frame; returns the new rate when an interval completes
    pub fn tick(&mut self, delta: f32) -> Option<f32> {
        self.frames += 1;
        self.elapsed += delta;

        if self.elapsed < self.interval {
            return None;
        }

        let fps = self.frames as f32 / self.elapsed;
        self.frames = 0;
        self.elapsed = 0.0;
        Some(fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn clock_measures_delta() {
        let mut clock = Clock::new();

        thread::sleep(Duration::from_millis(10));
        let delta = clock.tick();

        // Lower bound only: the scheduler may oversleep
        assert!(delta >= 0.009, "delta {}", delta);
    }

    #[test]
    fn clock_resets() {
        let mut clock = Clock::new();

        thread::sleep(Duration::from_millis(10));
        clock.reset();

        let delta = clock.tick();
        assert!(delta < 0.009, "delta {}", delta);
    }

    #[test]
    fn back_to_back_ticks_are_non_negative() {
        let mut clock = Clock::new();
        for _ in 0..100 {
            assert!(clock.tick() >= 0.0);
        }
    }

    #[test]
    fn fps_reported_once_per_interval() {
        let mut counter = FpsCounter::new(1.0);

        for _ in 0..7 {
            assert_eq!(counter.tick(0.125), None);
        }
        let fps = counter.tick(0.125).expect("interval elapsed");
        assert_eq!(fps, 8.0);

        assert_eq!(counter.tick(0.125), None);
    }
}
