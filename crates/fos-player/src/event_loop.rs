//! Event Loop
//!
//! Single-threaded macrotask queue with timers on a virtual clock.
//! Nothing runs in parallel: callers advance the clock, due timers move
//! into the task queue in due order, and tasks are drained one by one.

use std::collections::VecDeque;

/// Timer handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u32);

/// Timer task
#[derive(Debug, Clone)]
struct Timer<T> {
    id: TimerId,
    task: T,
    due_at: u64,
}

/// Event loop over task type `T`
#[derive(Debug)]
pub struct EventLoop<T> {
    /// Macrotask queue (expired timers, queued callbacks)
    macrotasks: VecDeque<T>,
    /// Pending timers
    timers: Vec<Timer<T>>,
    /// Next timer ID
    next_timer_id: u32,
    /// Current timestamp (ms)
    current_time: u64,
}

impl<T> EventLoop<T> {
    pub fn new() -> Self {
        Self {
            macrotasks: VecDeque::new(),
            timers: Vec::new(),
            next_timer_id: 1,
            current_time: 0,
        }
    }

    /// Queue a macrotask
    pub fn queue_task(&mut self, task: T) {
        self.macrotasks.push_back(task);
    }

    /// Set a timeout
    pub fn set_timeout(&mut self, task: T, delay_ms: u64) -> TimerId {
        let id = TimerId(self.next_timer_id);
        self.next_timer_id += 1;
        self.timers.push(Timer {
            id,
            task,
            due_at: self.current_time + delay_ms,
        });
        id
    }

    /// Clear a timeout. Returns false if it already fired or was cleared.
    pub fn clear_timer(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        before != self.timers.len()
    }

    /// Drop every pending timer and queued task
    pub fn clear_all(&mut self) {
        self.timers.clear();
        self.macrotasks.clear();
    }

    /// Advance time and queue due timers, earliest first
    pub fn advance(&mut self, delta_ms: u64) {
        self.current_time += delta_ms;

        let now = self.current_time;
        let mut due = Vec::new();
        let mut i = 0;
        while i < self.timers.len() {
            if self.timers[i].due_at <= now {
                due.push(self.timers.remove(i));
            } else {
                i += 1;
            }
        }
        // Ties keep scheduling order.
        due.sort_by_key(|t| (t.due_at, t.id.0));
        self.macrotasks.extend(due.into_iter().map(|t| t.task));
    }

    /// Get next macrotask (if any)
    pub fn next_task(&mut self) -> Option<T> {
        self.macrotasks.pop_front()
    }

    /// Due time of the earliest pending timer
    pub fn next_due(&self) -> Option<u64> {
        self.timers.iter().map(|t| t.due_at).min()
    }

    /// Check if there's pending work
    pub fn has_pending_work(&self) -> bool {
        !self.macrotasks.is_empty() || !self.timers.is_empty()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Get current time
    pub fn current_time(&self) -> u64 {
        self.current_time
    }
}

impl<T> Default for EventLoop<T> {
    fn default() -> Self {
        Self::new()
    }
}
