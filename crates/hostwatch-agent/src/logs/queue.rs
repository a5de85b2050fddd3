//! Per-source event queue between a tailer and the shipper.
//!
//! Each queue has exactly one producer (the source's tailer) and one
//! consumer (the shipping tick). Draining is "take everything currently
//! queued" and never blocks waiting for new events.
//!
//! # Memory bound
//!
//! The queue evicts its oldest event once it holds [`MAX_QUEUED_EVENTS`]
//! entries, so a backend outage cannot grow memory without bound; the
//! oldest lines are dropped with a warning instead.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::warn;

use crate::logs::LogEvent;

/// Maximum number of events buffered per source before FIFO eviction.
pub const MAX_QUEUED_EVENTS: usize = 50_000;

/// Thread-safe FIFO queue of log events for one source.
#[derive(Debug, Clone)]
pub struct EventQueue {
    inner: Arc<Mutex<VecDeque<LogEvent>>>,
    cap: usize,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(clippy::expect_used)]
impl EventQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(MAX_QUEUED_EVENTS)
    }

    /// Queue with a custom eviction cap, for tests.
    #[must_use]
    pub fn with_capacity(cap: usize) -> Self {
        EventQueue {
            inner: Arc::new(Mutex::new(VecDeque::new())),
            cap,
        }
    }

    /// Appends an event, evicting the oldest one when the queue is full.
    pub fn push(&self, event: LogEvent) {
        let mut queue = self.inner.lock().expect("lock poisoned");
        if queue.len() >= self.cap {
            queue.pop_front();
            warn!(
                "Log queue full ({} events), dropping oldest event",
                self.cap
            );
        }
        queue.push_back(event);
    }

    /// Takes every currently queued event, in enqueue order, without
    /// blocking. An empty queue yields an empty batch.
    #[must_use]
    pub fn drain(&self) -> Vec<LogEvent> {
        let mut queue = self.inner.lock().expect("lock poisoned");
        queue.drain(..).collect()
    }

    /// Puts a drained batch back at the front of the queue, preserving its
    /// order ahead of anything enqueued since the drain. Used when an
    /// append fails so events are retried next tick instead of lost.
    pub fn requeue_front(&self, events: Vec<LogEvent>) {
        let mut queue = self.inner.lock().expect("lock poisoned");
        for event in events.into_iter().rev() {
            queue.push_front(event);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().expect("lock poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
