//! Whole-frame timing
//!
//! Two windows are kept: the interval between successive `begin` calls, which
//! includes presentation waits and drives FPS, and the CPU work between
//! `begin` and `end`.

use super::ring_buffer::RingBuffer;
use std::time::{Duration, Instant};

pub struct FrameTimer {
    frame_start: Option<Instant>,
    intervals: RingBuffer<Duration>,
    work: RingBuffer<Duration>,
}

impl FrameTimer {
    pub fn new(capacity: usize) -> Self {
        Self {
            frame_start: None,
            intervals: RingBuffer::new(capacity),
            work: RingBuffer::new(capacity),
        }
    }

    pub fn begin(&mut self) {
        let now = Instant::now();
        if let Some(previous) = self.frame_start.replace(now) {
            self.intervals.push(now - previous);
        }
    }

    pub fn end(&mut self) {
        if let Some(start) = self.frame_start {
            self.work.push(start.elapsed());
        }
    }

    /// Presented frames per second; zero until two frames have begun.
    pub fn fps(&self) -> f64 {
        let avg = self.intervals.average().as_secs_f64();
        if avg > 0.0 {
            1.0 / avg
        } else {
            0.0
        }
    }

    /// Average wall-clock time per frame.
    pub fn frame_time_ms(&self) -> f64 {
        self.intervals.average().as_secs_f64() * 1000.0
    }

    pub fn frame_time_range_ms(&self) -> (f64, f64) {
        let (min, max) = self.intervals.min_max();
        (min.as_secs_f64() * 1000.0, max.as_secs_f64() * 1000.0)
    }

    /// Average CPU time between `begin` and `end`.
    pub fn work_time_ms(&self) -> f64 {
        self.work.average().as_secs_f64() * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_has_no_interval() {
        let mut timer = FrameTimer::new(4);
        timer.begin();
        timer.end();
        assert_eq!(timer.fps(), 0.0);
        assert!(timer.work_time_ms() >= 0.0);
    }

    #[test]
    fn interval_includes_time_outside_the_frame() {
        let mut timer = FrameTimer::new(4);
        for _ in 0..3 {
            timer.begin();
            timer.end();
            std::thread::sleep(Duration::from_millis(2));
        }
        let (min, max) = timer.frame_time_range_ms();
        assert!(min >= 2.0 && max >= min);
        assert!(timer.frame_time_ms() > timer.work_time_ms());
        assert!(timer.fps() > 0.0);
    }
}
