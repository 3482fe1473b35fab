//! Segment-processing progress aggregation.
//!
//! Pure state reducer turning heterogeneous status messages into one
//! normalized `{completed, total}` snapshot. Nothing here does I/O; the
//! orchestrator owns the tracker and feeds it from the status channel.

use serde::{Deserialize, Serialize};

/// Normalized processing progress for one upload attempt.
///
/// The total segment count is unknown until a `meta` message (or the
/// readiness probe) reports it; until then the display is indeterminate.
/// The completed count only moves forward within one attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressTracker {
    /// Total segments, once known.
    total: Option<u32>,
    /// Completed segments (monotonic within one attempt).
    completed: u32,
}

impl ProgressTracker {
    /// Create a fresh tracker: `{completed: 0, total: unknown}`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to the fresh state, as part of starting a new attempt.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Set the known total segment count, enabling determinate display.
    pub fn set_total(&mut self, total: u32) {
        self.total = Some(total);
    }

    /// Apply an absolute progress snapshot. Monotonic: a snapshot below the
    /// current count is ignored rather than moving progress backwards.
    pub fn record_snapshot(&mut self, completed: u32) {
        if completed > self.completed {
            self.completed = completed;
        }
    }

    /// Record one unit of finished work, for backends that emit per-task
    /// events instead of snapshots.
    pub fn record_task_done(&mut self) {
        self.completed = self.completed.saturating_add(1);
    }

    pub fn total(&self) -> Option<u32> {
        self.total
    }

    pub fn completed(&self) -> u32 {
        self.completed
    }

    /// Display percentage, clamped to [0, 100]. `None` while the total is
    /// unknown (indeterminate presentation).
    pub fn percent(&self) -> Option<u8> {
        let total = self.total?;
        if total == 0 {
            return Some(100);
        }
        let pct = (f64::from(self.completed) / f64::from(total) * 100.0).round();
        Some(pct.min(100.0) as u8)
    }

    /// Completion predicate: `completed >= total`, only meaningful once the
    /// total is known. This is the sole progress-driven completion trigger.
    pub fn is_complete(&self) -> bool {
        match self.total {
            Some(total) => self.completed >= total,
            None => false,
        }
    }

    /// Human-readable presentation for the status line:
    /// `"75% (3/4)"` when determinate, `"3 events"` otherwise.
    pub fn display(&self) -> String {
        match (self.percent(), self.total) {
            (Some(pct), Some(total)) => {
                format!("{}% ({}/{})", pct, self.completed, total)
            }
            _ => format!("{} events", self.completed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_tracker_is_indeterminate() {
        let tracker = ProgressTracker::new();
        assert_eq!(tracker.percent(), None);
        assert!(!tracker.is_complete());
        assert_eq!(tracker.display(), "0 events");
    }

    #[test]
    fn test_percent_sequence_is_monotone_and_clamped() {
        let mut tracker = ProgressTracker::new();
        tracker.set_total(4);

        let mut last = 0u8;
        for n in 1..=4 {
            tracker.record_snapshot(n);
            let pct = tracker.percent().unwrap();
            assert!(pct >= last);
            assert!(pct <= 100);
            last = pct;
        }
        assert_eq!(last, 100);
    }

    #[test]
    fn test_percent_values_for_four_segments() {
        let mut tracker = ProgressTracker::new();
        tracker.set_total(4);

        let mut seen = Vec::new();
        for n in 1..=4 {
            tracker.record_snapshot(n);
            seen.push(tracker.percent().unwrap());
        }
        assert_eq!(seen, vec![25, 50, 75, 100]);
    }

    #[test]
    fn test_snapshot_never_moves_backwards() {
        let mut tracker = ProgressTracker::new();
        tracker.set_total(10);
        tracker.record_snapshot(7);
        tracker.record_snapshot(3);
        assert_eq!(tracker.completed(), 7);
    }

    #[test]
    fn test_overshoot_clamps_to_hundred() {
        let mut tracker = ProgressTracker::new();
        tracker.set_total(4);
        tracker.record_snapshot(9);
        assert_eq!(tracker.percent(), Some(100));
        assert!(tracker.is_complete());
    }

    #[test]
    fn test_task_done_increments() {
        let mut tracker = ProgressTracker::new();
        tracker.record_task_done();
        tracker.record_task_done();
        assert_eq!(tracker.completed(), 2);
        assert_eq!(tracker.display(), "2 events");

        tracker.set_total(2);
        assert!(tracker.is_complete());
        assert_eq!(tracker.display(), "100% (2/2)");
    }

    #[test]
    fn test_completion_requires_known_total() {
        let mut tracker = ProgressTracker::new();
        tracker.record_snapshot(100);
        assert!(!tracker.is_complete());
    }

    #[test]
    fn test_reset_clears_counters() {
        let mut tracker = ProgressTracker::new();
        tracker.set_total(4);
        tracker.record_snapshot(4);
        tracker.reset();
        assert_eq!(tracker.completed(), 0);
        assert_eq!(tracker.total(), None);
    }

    #[test]
    fn test_zero_total_is_complete() {
        let mut tracker = ProgressTracker::new();
        tracker.set_total(0);
        assert_eq!(tracker.percent(), Some(100));
        assert!(tracker.is_complete());
    }
}
