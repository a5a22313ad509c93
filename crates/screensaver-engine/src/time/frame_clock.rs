use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the previous tick, clamped.
    pub dt: f32,

    /// Seconds since the clock was created or last reset (unclamped).
    pub elapsed: f32,

    /// Monotonic timestamp taken at the tick.
    pub now: Instant,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

/// Frame clock producing `FrameTime` snapshots.
///
/// Delta time is clamped so a debugger pause or a minimized window does not
/// fling the box across the bounds in a single step.
#[derive(Debug, Clone)]
pub struct FrameClock {
    start: Instant,
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    /// Creates a clock with the default clamps (0.1 ms .. 100 ms).
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(100))
    }

    /// Creates a clock with custom delta-time clamps.
    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        let now = Instant::now();
        Self {
            start: now,
            last: now,
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    /// Resets the clock baseline.
    ///
    /// Call after the window is restored so the first frame does not see the
    /// whole suspension as `dt`.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    /// Advances the clock to `Instant::now()`.
    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    /// Advances the clock to `now`.
    pub fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);

        self.last = now;

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            elapsed: now.saturating_duration_since(self.start).as_secs_f32(),
            now,
            frame_index: self.frame_index,
        };

        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> (FrameClock, Instant) {
        let c = FrameClock::with_clamps(Duration::from_millis(1), Duration::from_millis(50));
        let base = c.last;
        (c, base)
    }

    #[test]
    fn dt_is_time_between_ticks() {
        let (mut c, base) = clock();
        let ft = c.tick_at(base + Duration::from_millis(16));
        assert!((ft.dt - 0.016).abs() < 1e-6);
    }

    #[test]
    fn dt_clamped_to_max_after_stall() {
        let (mut c, base) = clock();
        let ft = c.tick_at(base + Duration::from_secs(3));
        assert!((ft.dt - 0.05).abs() < 1e-6);
        // elapsed is not clamped
        assert!((ft.elapsed - 3.0).abs() < 1e-4);
    }

    #[test]
    fn dt_clamped_to_min_for_back_to_back_ticks() {
        let (mut c, base) = clock();
        let ft = c.tick_at(base);
        assert!((ft.dt - 0.001).abs() < 1e-6);
    }

    #[test]
    fn frame_index_counts_ticks() {
        let (mut c, base) = clock();
        assert_eq!(c.tick_at(base + Duration::from_millis(10)).frame_index, 0);
        assert_eq!(c.tick_at(base + Duration::from_millis(20)).frame_index, 1);
        assert_eq!(c.tick_at(base + Duration::from_millis(30)).frame_index, 2);
    }
}
