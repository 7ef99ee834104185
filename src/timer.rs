//! Single-slot cancellable timer.
//!
//! The session never waits on a clock itself. It arms a timer with a kind and
//! a delay, the driver sleeps for that delay and hands the id back through
//! [`TimerSlot::fire`]. Arming again replaces the outstanding timer, and a
//! replaced (or cancelled) id is rejected when it finally fires, so a late
//! callback from an old countdown can never trigger a second capture.

use std::time::Duration;

/// Identity of one armed timer. Never reused within a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// An outstanding timer request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer<K> {
    pub id: TimerId,
    pub kind: K,
    pub delay: Duration,
}

#[derive(Debug)]
pub struct TimerSlot<K> {
    next_id: u64,
    armed: Option<Timer<K>>,
}

impl<K: Copy> TimerSlot<K> {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            armed: None,
        }
    }

    /// Arm a new timer, invalidating whatever was armed before.
    pub fn arm(&mut self, kind: K, delay: Duration) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.armed = Some(Timer { id, kind, delay });
        id
    }

    /// Drop the outstanding timer, if any.
    pub fn cancel(&mut self) -> Option<TimerId> {
        self.armed.take().map(|t| t.id)
    }

    pub fn pending(&self) -> Option<Timer<K>> {
        self.armed
    }

    /// Consume the timer if `id` is the one currently armed.
    ///
    /// Returns `None` for stale or unknown ids and leaves the slot alone.
    pub fn fire(&mut self, id: TimerId) -> Option<K> {
        match self.armed {
            Some(timer) if timer.id == id => {
                self.armed = None;
                Some(timer.kind)
            }
            _ => None,
        }
    }
}

impl<K: Copy> Default for TimerSlot<K> {
    fn default() -> Self {
        Self::new()
    }
}
