//! In-memory, per-run fan-out of structured log events.
//!
//! Each [`subscribe`](LogBus::subscribe) call hands back a [`Subscription`]
//! backed by its own bounded ring buffer. The bus holds only a [`Weak`]
//! reference to that ring, so a dropped subscription is pruned lazily the
//! next time its run publishes -- no explicit unsubscribe call is needed.
//! Publishing never blocks on a slow reader: a full ring drops its oldest
//! entry rather than stall the worker thread producing events.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex, Weak};

use genglossary_core::enums::LogLevel;
use genglossary_core::time::{format_datetime, now_utc};

/// Bounded per-subscriber capacity before drop-oldest kicks in.
const RING_CAPACITY: usize = 256;

/// A single structured log event for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub run_id: i64,
    pub level: LogLevel,
    pub message: String,
    pub timestamp: String,
    pub step: Option<String>,
    pub progress_current: Option<i64>,
    pub progress_total: Option<i64>,
    pub current_term: Option<String>,
    /// The terminal marker. When set, every other field is a placeholder;
    /// consumers stop reading after observing it.
    pub complete: bool,
}

impl LogEvent {
    fn new(run_id: i64, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            run_id,
            level,
            message: message.into(),
            timestamp: format_datetime(&now_utc()),
            step: None,
            progress_current: None,
            progress_total: None,
            current_term: None,
            complete: false,
        }
    }

    pub fn info(run_id: i64, message: impl Into<String>) -> Self {
        Self::new(run_id, LogLevel::Info, message)
    }

    pub fn warning(run_id: i64, message: impl Into<String>) -> Self {
        Self::new(run_id, LogLevel::Warning, message)
    }

    pub fn error(run_id: i64, message: impl Into<String>) -> Self {
        Self::new(run_id, LogLevel::Error, message)
    }

    pub fn with_progress(
        mut self,
        step: impl Into<String>,
        current: i64,
        total: i64,
        current_term: Option<String>,
    ) -> Self {
        self.step = Some(step.into());
        self.progress_current = Some(current);
        self.progress_total = Some(total);
        self.current_term = current_term;
        self
    }

    /// The terminal marker appended once a worker finishes its cleanup.
    pub fn terminal(run_id: i64) -> Self {
        Self {
            complete: true,
            ..Self::new(run_id, LogLevel::Info, "run finished")
        }
    }
}

struct Ring {
    queue: Mutex<VecDeque<LogEvent>>,
    condvar: Condvar,
    capacity: usize,
}

impl Ring {
    fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            condvar: Condvar::new(),
            capacity,
        }
    }

    fn push(&self, event: LogEvent) {
        let mut queue = self.queue.lock().unwrap();
        if queue.len() >= self.capacity {
            queue.pop_front();
        }
        queue.push_back(event);
        self.condvar.notify_all();
    }

    /// Blocks until an event is available.
    fn recv(&self) -> LogEvent {
        let mut queue = self.queue.lock().unwrap();
        loop {
            if let Some(event) = queue.pop_front() {
                return event;
            }
            queue = self.condvar.wait(queue).unwrap();
        }
    }

    fn try_recv(&self) -> Option<LogEvent> {
        self.queue.lock().unwrap().pop_front()
    }
}

/// A live subscription to one run's log stream.
pub struct Subscription {
    ring: Arc<Ring>,
}

impl Subscription {
    /// Blocks until the next event is published, including the terminal marker.
    pub fn recv(&self) -> LogEvent {
        self.ring.recv()
    }

    /// Non-blocking poll, for HTTP/async bridges that drive their own loop.
    pub fn try_recv(&self) -> Option<LogEvent> {
        self.ring.try_recv()
    }
}

/// Fan-out hub for one project's worth of runs. Shared between the run
/// manager (which publishes) and any number of SSE handlers or CLI
/// `logs --follow` sessions (which subscribe).
pub struct LogBus {
    subscribers: Mutex<HashMap<i64, Vec<Weak<Ring>>>>,
}

impl LogBus {
    pub fn new() -> Self {
        Self { subscribers: Mutex::new(HashMap::new()) }
    }

    /// Registers a new subscriber for `run_id` and returns its handle.
    pub fn subscribe(&self, run_id: i64) -> Subscription {
        let ring = Arc::new(Ring::new(RING_CAPACITY));
        self.subscribers
            .lock()
            .unwrap()
            .entry(run_id)
            .or_default()
            .push(Arc::downgrade(&ring));
        Subscription { ring }
    }

    /// Delivers `event` to every live subscriber of its run, pruning any
    /// whose `Subscription` has since been dropped.
    pub fn publish(&self, event: LogEvent) {
        let mut subscribers = self.subscribers.lock().unwrap();
        if let Some(rings) = subscribers.get_mut(&event.run_id) {
            rings.retain(|weak| {
                if let Some(ring) = weak.upgrade() {
                    ring.push(event.clone());
                    true
                } else {
                    false
                }
            });
            if rings.is_empty() {
                subscribers.remove(&event.run_id);
            }
        }
    }
}

impl Default for LogBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn publish_before_subscribe_is_lost() {
        let bus = LogBus::new();
        bus.publish(LogEvent::info(1, "nobody heard this"));
        let sub = bus.subscribe(1);
        bus.publish(LogEvent::info(1, "heard"));
        assert_eq!(sub.recv().message, "heard");
    }

    #[test]
    fn multiple_subscribers_each_get_every_event() {
        let bus = LogBus::new();
        let a = bus.subscribe(1);
        let b = bus.subscribe(1);
        bus.publish(LogEvent::info(1, "hello"));
        assert_eq!(a.try_recv().unwrap().message, "hello");
        assert_eq!(b.try_recv().unwrap().message, "hello");
    }

    #[test]
    fn ring_drops_oldest_when_full() {
        let bus = LogBus::new();
        let sub = bus.subscribe(1);
        for i in 0..(RING_CAPACITY + 10) {
            bus.publish(LogEvent::info(1, format!("event-{i}")));
        }
        let first = sub.try_recv().unwrap();
        assert_eq!(first.message, "event-10");
    }

    #[test]
    fn dropped_subscription_is_pruned_on_next_publish() {
        let bus = LogBus::new();
        {
            let _sub = bus.subscribe(1);
            assert_eq!(bus.subscribers.lock().unwrap().get(&1).unwrap().len(), 1);
        }
        bus.publish(LogEvent::info(1, "prune me"));
        assert!(!bus.subscribers.lock().unwrap().contains_key(&1));
    }

    #[test]
    fn terminal_marker_is_observed() {
        let bus = LogBus::new();
        let sub = bus.subscribe(7);
        bus.publish(LogEvent::info(7, "working"));
        bus.publish(LogEvent::terminal(7));
        assert!(!sub.recv().complete);
        assert!(sub.recv().complete);
    }

    #[test]
    fn blocking_recv_wakes_on_publish_from_another_thread() {
        let bus = Arc::new(LogBus::new());
        let sub = bus.subscribe(1);
        let publisher = bus.clone();
        let handle = thread::spawn(move || {
            publisher.publish(LogEvent::info(1, "from another thread"));
        });
        assert_eq!(sub.recv().message, "from another thread");
        handle.join().unwrap();
    }
}
