//! Delayed outcomes
//!
//! Tumbles, falls and avalanches fail the session after a short delay, and
//! every outcome ends the session after another. These are plain deadlines
//! drained once per tick; a reload clears them.

use serde::{Deserialize, Serialize};

use super::session::FailReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduledEvent {
    Fail(FailReason),
    SessionEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Timer {
    deadline_ms: f64,
    event: ScheduledEvent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimerQueue {
    /// Insertion order
    timers: Vec<Timer>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, deadline_ms: f64, event: ScheduledEvent) {
        self.timers.push(Timer { deadline_ms, event });
    }

    /// Remove and return every event due at `now_ms`, earliest first. Equal
    /// deadlines keep scheduling order.
    pub fn drain_due(&mut self, now_ms: f64) -> Vec<ScheduledEvent> {
        let (mut due, pending): (Vec<Timer>, Vec<Timer>) = self
            .timers
            .drain(..)
            .partition(|t| t.deadline_ms <= now_ms);
        self.timers = pending;
        due.sort_by(|a, b| a.deadline_ms.total_cmp(&b.deadline_ms));
        due.into_iter().map(|t| t.event).collect()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_due_in_deadline_order() {
        let mut q = TimerQueue::new();
        q.schedule(2000.0, ScheduledEvent::SessionEnd);
        q.schedule(1500.0, ScheduledEvent::Fail(FailReason::Cliff));
        q.schedule(1500.0, ScheduledEvent::Fail(FailReason::Tumble));

        assert!(q.drain_due(1000.0).is_empty());
        assert_eq!(
            q.drain_due(1500.0),
            vec![
                ScheduledEvent::Fail(FailReason::Cliff),
                ScheduledEvent::Fail(FailReason::Tumble)
            ]
        );
        assert_eq!(q.len(), 1);
        assert_eq!(q.drain_due(5000.0), vec![ScheduledEvent::SessionEnd]);
        assert!(q.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut q = TimerQueue::new();
        q.schedule(10.0, ScheduledEvent::SessionEnd);
        q.clear();
        assert!(q.drain_due(100.0).is_empty());
    }
}
