//! Event loop
//!
//! setTimeout / requestAnimationFrame on a virtual clock. Time only moves
//! when the host calls `Document::advance`, which keeps component
//! behaviour deterministic.

use std::time::Duration;

use crate::Document;

/// Deferred unit of work
pub(crate) type Task = Box<dyn FnOnce(&mut Document) -> anyhow::Result<()>>;

/// Handle for a scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

struct ScheduledTask {
    id: TimerId,
    due: Duration,
    label: &'static str,
    task: Task,
}

/// Pending tasks ordered by deadline, then by scheduling order
#[derive(Default)]
pub(crate) struct EventLoop {
    now: Duration,
    next_id: u64,
    queue: Vec<ScheduledTask>,
}

impl EventLoop {
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn schedule(&mut self, delay: Duration, label: &'static str, task: Task) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.queue.push(ScheduledTask {
            id,
            due: self.now + delay,
            label,
            task,
        });
        id
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.queue.len();
        self.queue.retain(|t| t.id != id);
        self.queue.len() != before
    }

    /// Remove the earliest task due at or before `deadline`
    pub fn take_due(&mut self, deadline: Duration) -> Option<(Duration, &'static str, Task)> {
        let index = self
            .queue
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= deadline)
            .min_by_key(|(_, t)| (t.due, t.id.0))
            .map(|(i, _)| i)?;
        let scheduled = self.queue.remove(index);
        Some((scheduled.due, scheduled.label, scheduled.task))
    }

    pub fn set_now(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }

    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn time_until_next(&self) -> Option<Duration> {
        self.queue
            .iter()
            .map(|t| t.due.saturating_sub(self.now))
            .min()
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("now", &self.now)
            .field("pending", &self.queue.len())
            .finish()
    }
}
