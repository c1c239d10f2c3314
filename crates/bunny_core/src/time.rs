//! Frame time
//!
//! Physics is expressed in 60Hz reference frames. Wall-clock time is measured
//! here and converted to a dimensionless step by [`step_scale`].

use std::time::{Duration, Instant};

use crate::constants::{MAX_FRAME_DELTA_MS, TARGET_FRAME_TIME_MS};

/// Clamp elapsed milliseconds into `[0, MAX_FRAME_DELTA_MS]`.
///
/// Negative and NaN inputs become zero so a bad clock reading can never move
/// a body backwards or poison the buffers.
#[inline]
pub fn clamp_delta_ms(delta_ms: f32) -> f32 {
    if delta_ms > 0.0 {
        delta_ms.min(MAX_FRAME_DELTA_MS)
    } else {
        0.0
    }
}

/// Number of reference frames covered by `delta_ms`, after clamping.
#[inline]
pub fn step_scale(delta_ms: f32) -> f32 {
    clamp_delta_ms(delta_ms) / TARGET_FRAME_TIME_MS
}

/// Wall-clock tracker for the frame loop
pub struct FrameClock {
    last: Instant,
    frame_count: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
            frame_count: 0,
        }
    }

    /// Milliseconds since the previous call (or since construction).
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last);
        self.last = now;
        self.frame_count += 1;
        duration_ms(elapsed)
    }

    /// Forget time spent while no frames were produced (e.g. during a
    /// device rebuild).
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

fn duration_ms(duration: Duration) -> f32 {
    (duration.as_secs_f64() * 1000.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_caps_stalls() {
        assert_eq!(clamp_delta_ms(5_000.0), MAX_FRAME_DELTA_MS);
        assert_eq!(clamp_delta_ms(f32::INFINITY), MAX_FRAME_DELTA_MS);
        assert_eq!(clamp_delta_ms(16.0), 16.0);
    }

    #[test]
    fn clamp_rejects_negative_and_nan() {
        assert_eq!(clamp_delta_ms(-3.0), 0.0);
        assert_eq!(clamp_delta_ms(f32::NAN), 0.0);
    }

    #[test]
    fn one_reference_frame_is_unit_step() {
        assert_eq!(step_scale(TARGET_FRAME_TIME_MS), 1.0);
        assert_eq!(step_scale(0.0), 0.0);
    }

    #[test]
    fn clock_counts_frames() {
        let mut clock = FrameClock::new();
        let a = clock.tick();
        let b = clock.tick();
        assert!(a >= 0.0 && b >= 0.0);
        assert_eq!(clock.frame_count(), 2);
    }
}
