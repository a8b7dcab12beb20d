//! Debouncing of change notifications
//!
//! Every new event restarts the timer, so a burst produces a single firing
//! `delay` after its last event.

use crate::{DocumentEvent, EventCoalescer};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::trace;

/// Restartable one-shot timer
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, deadline: None }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Change the delay; an armed timer keeps its current deadline
    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    /// (Re)start the timer
    pub fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.delay);
    }

    /// Make the timer due immediately
    pub fn fire_now(&mut self) {
        self.deadline = Some(Instant::now());
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Future completing at the current deadline; never completes if disarmed
    ///
    /// The future does not borrow the debouncer, so it can sit in a
    /// `select!` next to branches that re-arm it.
    pub fn expired(&self) -> impl Future<Output = ()> + Send + 'static {
        let deadline = self.deadline;
        async move {
            match deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        }
    }
}

/// Pending events plus the timer that releases them
#[derive(Debug)]
pub struct DebouncedQueue {
    pending: EventCoalescer,
    timer: Debouncer,
}

impl DebouncedQueue {
    pub fn new(delay: Duration) -> Self {
        Self {
            pending: EventCoalescer::new(),
            timer: Debouncer::new(delay),
        }
    }

    /// Queue an event and restart the timer
    pub fn push(&mut self, event: DocumentEvent) {
        trace!("Queued {:?} ({} pending)", event, self.pending.len() + 1);
        self.pending.push(event);
        self.timer.arm();
    }

    /// Restart the timer without queueing anything (e.g. a settings change)
    pub fn poke(&mut self) {
        self.timer.arm();
    }

    /// Release on the next poll instead of after the delay
    pub fn fire_now(&mut self) {
        self.timer.fire_now();
    }

    pub fn set_delay(&mut self, delay: Duration) {
        self.timer.set_delay(delay);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn is_armed(&self) -> bool {
        self.timer.is_armed()
    }

    /// Future completing when the queue is due
    pub fn ready(&self) -> impl Future<Output = ()> + Send + 'static {
        self.timer.expired()
    }

    /// Take every pending event and disarm the timer
    pub fn take(&mut self) -> Vec<DocumentEvent> {
        self.timer.cancel();
        self.pending.drain()
    }
}
