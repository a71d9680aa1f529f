//! Timer-free debounce: callers supply the clock.
//!
//! Rescheduling moves the deadline instead of queueing, so any burst of
//! schedule calls collapses to a single firing after the quiet period.

/// Quiet period before the search indexes rebuild.
pub const REBUILD_WINDOW_MS: u64 = 1_000;

#[derive(Debug)]
pub struct Debouncer {
    window_ms: u64,
    deadline: Option<u64>,
    generation: u64,
}

impl Debouncer {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            deadline: None,
            generation: 0,
        }
    }

    /// Arms (or re-arms) the deadline at `now_ms + window`. A pending
    /// deadline is superseded, never queued.
    pub fn schedule(&mut self, now_ms: u64) {
        self.deadline = Some(now_ms.saturating_add(self.window_ms));
        self.generation += 1;
    }

    /// Consumes the deadline if it has passed. At most one `true` per
    /// armed deadline.
    pub fn take_due(&mut self, now_ms: u64) -> bool {
        match self.deadline {
            Some(deadline) if now_ms >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// How many times scheduling superseded or armed the deadline.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
