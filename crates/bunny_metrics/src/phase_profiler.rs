//! Accumulated timings for the named phases of a frame
//! (simulate, upload, render, ...)

use std::time::{Duration, Instant};

#[derive(Default)]
pub struct PhaseProfiler {
    // Few phases, fixed names: a Vec keeps insertion order for reports.
    timings: Vec<(&'static str, Duration)>,
}

impl PhaseProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn time<F, R>(&mut self, phase: &'static str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        self.record(phase, start.elapsed());
        result
    }

    pub fn record(&mut self, phase: &'static str, elapsed: Duration) {
        match self.timings.iter_mut().find(|(name, _)| *name == phase) {
            Some((_, total)) => *total += elapsed,
            None => self.timings.push((phase, elapsed)),
        }
    }

    pub fn total_ms(&self, phase: &str) -> f64 {
        self.timings
            .iter()
            .find(|(name, _)| *name == phase)
            .map(|(_, total)| total.as_secs_f64() * 1000.0)
            .unwrap_or(0.0)
    }

    /// `name=1.23ms` pairs in first-seen order.
    pub fn summary(&self) -> String {
        self.timings
            .iter()
            .map(|(name, total)| format!("{}={:.2}ms", name, total.as_secs_f64() * 1000.0))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn reset(&mut self) {
        self.timings.clear();
    }
}
