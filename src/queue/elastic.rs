//! Elastic Blocking Queue
//!
//! Capacity moves in whole units of the initial capacity:
//!
//! - **grow**: a `put` that finds the ring full replaces it with one that is
//!   `initial_capacity` slots larger, then inserts. Growth never waits.
//! - **shrink**: after any successful `put` or `take`, if fewer than
//!   `initial_capacity` items remain and the ring is larger than that, the
//!   ring is replaced by one of exactly `initial_capacity` slots.
//!
//! Both happen under the same lock as `put`/`take`, so a resize decision and
//! its commit can never interleave with another operation.

use std::sync::Arc;
use std::time::Duration;
use crate::queue::error::{check_capacity, QueueResult};
use crate::queue::monitor::{Condition, Monitor};
use crate::queue::ring::RingBuffer;
use crate::queue::shutdown::{ShutdownListener, ShutdownSignal};
use crate::queue::{BlockingQueue, QueueSnapshot, ResizeStats};

struct ElasticState<T> {
    ring: RingBuffer<T>,
    initial_capacity: usize,
    stats: ResizeStats,
}

impl<T> ElasticState<T> {
    fn capacity(&self) -> usize {
        self.ring.len()
    }

    fn grow(&mut self) {
        // only called with a full ring; nothing else can fill it under the lock
        debug_assert!(self.ring.is_full());
        let next = self.capacity() + self.initial_capacity;
        self.ring.resize(next);
        self.stats.grows += 1;
    }

    fn shrink_if_underused(&mut self) {
        if self.ring.count() < self.initial_capacity && self.capacity() > self.initial_capacity {
            self.ring.resize(self.initial_capacity);
            self.stats.shrinks += 1;
        }
    }

    fn insert(&mut self, item: T) {
        if self.ring.is_full() {
            self.grow();
        }
        if self.ring.push(item).is_err() {
            unreachable!("ring full after grow");
        }
        self.shrink_if_underused();
        debug_assert_eq!(self.capacity() % self.initial_capacity, 0);
    }

    fn remove(&mut self) -> Option<T> {
        let item = self.ring.pop()?;
        self.shrink_if_underused();
        Some(item)
    }
}

/// Blocking FIFO queue whose capacity grows and shrinks with load
pub struct ElasticQueue<T> {
    monitor: Arc<Monitor<ElasticState<T>>>,
    initial_capacity: usize,
    signal: ShutdownSignal,
}

impl<T: Send + 'static> ElasticQueue<T> {
    /// Create a queue observing its own, private shutdown signal
    pub fn new(initial_capacity: i64) -> QueueResult<Self> {
        Self::with_shutdown(initial_capacity, ShutdownSignal::new())
    }

    /// Create a queue that is cancelled by a shared shutdown signal
    pub fn with_shutdown(initial_capacity: i64, signal: ShutdownSignal) -> QueueResult<Self> {
        let initial_capacity = check_capacity(initial_capacity)?;
        let state = ElasticState {
            ring: RingBuffer::new(initial_capacity),
            initial_capacity,
            stats: ResizeStats::default(),
        };
        let monitor = Arc::new(Monitor::new(state));
        let listener: Arc<dyn ShutdownListener> = monitor.clone();
        signal.register(&listener);

        Ok(Self {
            monitor,
            initial_capacity,
            signal,
        })
    }
}

impl<T> ElasticQueue<T> {
    /// Number of grow and shrink events so far
    pub fn resize_stats(&self) -> ResizeStats {
        self.monitor.lock().stats
    }
}

impl<T: Send> BlockingQueue<T> for ElasticQueue<T> {
    fn put(&self, item: T) -> QueueResult<()> {
        let mut state = self.monitor.lock();
        if state.ring.is_full() {
            state.grow();
        }
        // growth always frees a slot, so this never suspends
        self.monitor
            .wait_while(&mut state, Condition::NotFull, &self.signal, |s| s.ring.is_full())?;

        state.insert(item);
        self.monitor.notify_not_empty();
        Ok(())
    }

    fn take(&self) -> QueueResult<T> {
        let mut state = self.monitor.lock();
        self.monitor
            .wait_while(&mut state, Condition::NotEmpty, &self.signal, |s| s.ring.is_empty())?;

        let item = match state.remove() {
            Some(item) => item,
            None => unreachable!("ring reported an item after wait"),
        };
        self.monitor.notify_not_full();
        Ok(item)
    }

    fn try_put(&self, item: T) -> Result<(), T> {
        // growth is unconditional, so a non-blocking put always succeeds
        self.monitor.lock().insert(item);
        self.monitor.notify_not_empty();
        Ok(())
    }

    fn try_take(&self) -> Option<T> {
        let item = self.monitor.lock().remove()?;
        self.monitor.notify_not_full();
        Some(item)
    }

    fn wait_not_full(&self, _timeout: Duration) -> bool {
        true
    }

    fn wait_not_empty(&self, timeout: Duration) -> bool {
        self.monitor
            .wait_for(Condition::NotEmpty, timeout, &self.signal, |s| !s.ring.is_empty())
    }

    fn size(&self) -> usize {
        self.monitor.lock().ring.count()
    }

    fn capacity(&self) -> usize {
        self.monitor.lock().capacity()
    }

    fn initial_capacity(&self) -> usize {
        self.initial_capacity
    }

    fn is_empty(&self) -> bool {
        self.monitor.lock().ring.is_empty()
    }

    /// Full at the current capacity; the next `put` will grow
    fn is_full(&self) -> bool {
        self.monitor.lock().ring.is_full()
    }

    fn is_saturated(&self) -> bool {
        false
    }

    fn snapshot(&self) -> QueueSnapshot {
        let state = self.monitor.lock();
        QueueSnapshot {
            size: state.ring.count(),
            capacity: state.capacity(),
            initial_capacity: self.initial_capacity,
            is_empty: state.ring.is_empty(),
            is_full: state.ring.is_full(),
        }
    }

    fn shutdown_signal(&self) -> &ShutdownSignal {
        &self.signal
    }
}

impl<T> std::fmt::Debug for ElasticQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.monitor.lock();
        f.debug_struct("ElasticQueue")
            .field("size", &state.ring.count())
            .field("capacity", &state.capacity())
            .field("initial_capacity", &self.initial_capacity)
            .field("stats", &state.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elastic_queue_creation() {
        let queue = ElasticQueue::<u8>::new(5).unwrap();
        assert_eq!(queue.initial_capacity(), 5);
        assert_eq!(queue.capacity(), 5);
        assert!(queue.is_empty());
        assert_eq!(queue.resize_stats(), ResizeStats::default());
    }

    #[test]
    fn test_never_saturated() {
        let queue = ElasticQueue::new(1).unwrap();
        queue.put(1).unwrap();
        assert!(queue.is_full());
        assert!(!queue.is_saturated());
        assert!(queue.wait_not_full(Duration::from_millis(1)));
        assert!(queue.try_put(2).is_ok());
        assert_eq!(queue.capacity(), 2);
    }

    #[test]
    fn test_resize_stats_count_events() {
        let queue = ElasticQueue::new(2).unwrap();
        for i in 0..5 {
            queue.put(i).unwrap();
        }
        // 2 -> 4 at the 3rd put, 4 -> 6 at the 5th
        assert_eq!(queue.capacity(), 6);
        for _ in 0..4 {
            queue.take().unwrap();
        }
        assert_eq!(queue.capacity(), 2);
        assert_eq!(queue.resize_stats(), ResizeStats { grows: 2, shrinks: 1 });
    }

    #[test]
    fn test_shrink_to_floor_when_emptied() {
        let queue = ElasticQueue::new(3).unwrap();
        for i in 0..4 {
            queue.put(i).unwrap();
        }
        assert_eq!(queue.capacity(), 6);
        // 4 -> 3 items: not below the floor yet
        queue.take().unwrap();
        assert_eq!(queue.capacity(), 6);
        // 3 -> 2 items: snap straight to 3
        queue.take().unwrap();
        assert_eq!(queue.capacity(), 3);
        queue.take().unwrap();
        queue.take().unwrap();
        assert!(queue.is_empty());
        assert_eq!(queue.capacity(), 3);
    }
}
