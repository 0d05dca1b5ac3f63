use std::time::{Duration, Instant};

/// Timing of one frame.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the previous tick, clamped.
    pub dt: f32,

    /// Wall-clock instant of the tick. Pointer click windows are measured
    /// against it.
    pub now: Instant,

    /// Sum of every clamped `dt` since the clock started or was reset.
    ///
    /// This is the `elapsed` value handed to enter-frame handlers. Because it
    /// accumulates clamped deltas, a stall (debugger, minimized window) moves
    /// animations forward by at most `dt_max`.
    pub since_start: f32,

    pub frame_index: u64,
}

/// Produces one [`FrameTime`] per presented frame.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Option<Instant>,
    elapsed: Duration,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    /// Clock clamping `dt` to `[100 µs, 250 ms]`.
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            last: None,
            elapsed: Duration::ZERO,
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    /// Restarts `since_start` and the frame counter from zero.
    pub fn reset(&mut self) {
        self.last = None;
        self.elapsed = Duration::ZERO;
        self.frame_index = 0;
    }

    #[inline]
    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    /// Advances the clock to `now`.
    ///
    /// The first tick after construction or [`reset`](Self::reset) has
    /// `dt = dt_min` and `since_start = 0`.
    pub fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = match self.last {
            Some(last) => {
                let dt = now.saturating_duration_since(last).clamp(self.dt_min, self.dt_max);
                self.elapsed += dt;
                dt
            }
            None => self.dt_min,
        };
        self.last = Some(now);

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            now,
            since_start: self.elapsed.as_secs_f32(),
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

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn first_tick_starts_at_zero() {
        let mut clock = FrameClock::new();
        let ft = clock.tick_at(Instant::now());
        assert_eq!(ft.since_start, 0.0);
        assert_eq!(ft.frame_index, 0);
    }

    #[test]
    fn elapsed_accumulates_clamped_deltas() {
        let mut clock = FrameClock::with_clamps(ms(1), ms(100));
        let t0 = Instant::now();
        clock.tick_at(t0);

        let a = clock.tick_at(t0 + ms(16));
        assert!((a.dt - 0.016).abs() < 1e-6);

        // A five second stall only advances by the clamp.
        let b = clock.tick_at(t0 + ms(5016));
        assert!((b.dt - 0.1).abs() < 1e-6);
        assert!((b.since_start - 0.116).abs() < 1e-5);
        assert_eq!(b.frame_index, 2);
    }

    #[test]
    fn tiny_delta_is_raised_to_minimum() {
        let mut clock = FrameClock::with_clamps(ms(10), ms(20));
        let t0 = Instant::now();
        clock.tick_at(t0);
        assert!((clock.tick_at(t0).dt - 0.010).abs() < 1e-6);
    }

    #[test]
    fn reset_restarts_elapsed() {
        let mut clock = FrameClock::new();
        let t0 = Instant::now();
        clock.tick_at(t0);
        clock.tick_at(t0 + ms(50));
        clock.reset();
        let ft = clock.tick_at(t0 + ms(100));
        assert_eq!(ft.since_start, 0.0);
        assert_eq!(ft.frame_index, 0);
    }
}
