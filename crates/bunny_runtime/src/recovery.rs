//! Rebuild scheduling after device loss

use std::time::{Duration, Instant};

/// A single pending rebuild, due a fixed backoff after it was scheduled.
#[derive(Debug)]
pub struct RebuildSchedule {
    backoff: Duration,
    due: Option<Instant>,
    attempts: u32,
}

impl RebuildSchedule {
    pub fn new(backoff: Duration) -> Self {
        Self {
            backoff,
            due: None,
            attempts: 0,
        }
    }

    /// Rescheduling while pending pushes the deadline out.
    pub fn schedule(&mut self, now: Instant) {
        self.due = Some(now + self.backoff);
    }

    pub fn is_pending(&self) -> bool {
        self.due.is_some()
    }

    /// Rebuilds attempted since the last successful one.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// True once per schedule, when the backoff has elapsed.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.due {
            Some(due) if now >= due => {
                self.due = None;
                self.attempts += 1;
                true
            }
            _ => false,
        }
    }

    pub fn succeeded(&mut self) {
        self.attempts = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_after_backoff_only_once() {
        let start = Instant::now();
        let mut schedule = RebuildSchedule::new(Duration::from_millis(1000));
        assert!(!schedule.take_due(start));

        schedule.schedule(start);
        assert!(schedule.is_pending());
        assert!(!schedule.take_due(start + Duration::from_millis(999)));
        assert!(schedule.take_due(start + Duration::from_millis(1000)));
        assert!(!schedule.take_due(start + Duration::from_secs(5)));
        assert!(!schedule.is_pending());
        assert_eq!(schedule.attempts(), 1);
    }

    #[test]
    fn failed_rebuild_can_be_rescheduled() {
        let start = Instant::now();
        let mut schedule = RebuildSchedule::new(Duration::from_millis(10));
        schedule.schedule(start);
        assert!(schedule.take_due(start + Duration::from_millis(10)));

        schedule.schedule(start + Duration::from_millis(10));
        assert!(schedule.take_due(start + Duration::from_millis(20)));
        assert_eq!(schedule.attempts(), 2);

        schedule.succeeded();
        assert_eq!(schedule.attempts(), 0);
    }

    #[test]
    fn zero_backoff_is_immediately_due() {
        let now = Instant::now();
        let mut schedule = RebuildSchedule::new(Duration::ZERO);
        schedule.schedule(now);
        assert!(schedule.take_due(now));
    }
}
