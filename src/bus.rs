//! Lossy multicast event bus.
//!
//! The publishing side is the foreign engine's own callback thread; blocking
//! it risks deadlocking the native engine, so backpressure is resolved by
//! discarding the oldest buffered event per subscriber instead of blocking
//! or growing without bound.

use crate::model::EngineEvent;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::Notify;

/// Per-subscriber buffer size. Matches the engine's burst behavior: a full
/// panel refresh emits a handful of events back to back.
pub const DEFAULT_CAPACITY: usize = 15;

struct Mailbox {
    queue: Mutex<VecDeque<EngineEvent>>,
    notify: Notify,
    capacity: usize,
}

impl Mailbox {
    /// Push, evicting the oldest entry when full. Never blocks.
    fn push(&self, event: EngineEvent) {
        let mut queue = self.queue.lock().unwrap();
        if queue.len() == self.capacity {
            queue.pop_front();
        }
        queue.push_back(event);
        drop(queue);
        self.notify.notify_one();
    }
}

/// Bounded, multicast, drop-oldest stream of [`EngineEvent`]s.
///
/// `publish` never blocks on slow subscribers; each subscriber has an
/// independent bounded buffer, so there is no guarantee that all subscribers
/// see the same subset of events under overflow.
pub struct EventBus {
    subscribers: Mutex<Vec<Weak<Mailbox>>>,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    /// A zero capacity is treated as 1: the bus is lossy, never closed.
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            capacity: capacity.max(1),
        }
    }

    /// Deliver `event` to every live subscriber. O(subscribers), non-blocking.
    ///
    /// Dropped subscriptions are pruned here rather than on drop, keeping
    /// `Subscription::drop` trivial.
    pub fn publish(&self, event: &EngineEvent) {
        let mut subs = self.subscribers.lock().unwrap();
        subs.retain(|slot| match slot.upgrade() {
            Some(mailbox) => {
                mailbox.push(event.clone());
                true
            }
            None => false,
        });
    }

    /// Register a new subscriber. No replay: only events published after
    /// this call are observed.
    pub fn subscribe(&self) -> Subscription {
        let mailbox = Arc::new(Mailbox {
            queue: Mutex::new(VecDeque::with_capacity(self.capacity)),
            notify: Notify::new(),
            capacity: self.capacity,
        });
        self.subscribers
            .lock()
            .unwrap()
            .push(Arc::downgrade(&mailbox));
        Subscription { mailbox }
    }
}

/// Receiving end of one [`EventBus`] subscription, FIFO among events that
/// were not dropped.
pub struct Subscription {
    mailbox: Arc<Mailbox>,
}

impl Subscription {
    /// Wait for the next event.
    pub async fn recv(&mut self) -> EngineEvent {
        loop {
            if let Some(event) = self.try_recv() {
                return event;
            }
            self.mailbox.notify.notified().await;
        }
    }

    /// Non-blocking probe.
    pub fn try_recv(&mut self) -> Option<EngineEvent> {
        self.mailbox.queue.lock().unwrap().pop_front()
    }
}
