//! Fixed-Capacity Blocking Queue
//!
//! A ring buffer of fixed length behind one lock. `put` suspends while the
//! ring is full, `take` while it is empty.

use std::sync::Arc;
use std::time::Duration;
use crate::queue::error::{check_capacity, QueueResult};
use crate::queue::monitor::{Condition, Monitor};
use crate::queue::ring::RingBuffer;
use crate::queue::shutdown::{ShutdownListener, ShutdownSignal};
use crate::queue::{BlockingQueue, QueueSnapshot};

/// Blocking FIFO queue with a fixed maximum number of items
pub struct BoundedQueue<T> {
    monitor: Arc<Monitor<RingBuffer<T>>>,
    capacity: usize,
    signal: ShutdownSignal,
}

impl<T: Send + 'static> BoundedQueue<T> {
    /// Create a queue observing its own, private shutdown signal
    pub fn new(capacity: i64) -> QueueResult<Self> {
        Self::with_shutdown(capacity, ShutdownSignal::new())
    }

    /// Create a queue that is cancelled by a shared shutdown signal
    pub fn with_shutdown(capacity: i64, signal: ShutdownSignal) -> QueueResult<Self> {
        let capacity = check_capacity(capacity)?;
        let monitor = Arc::new(Monitor::new(RingBuffer::new(capacity)));
        let listener: Arc<dyn ShutdownListener> = monitor.clone();
        signal.register(&listener);

        Ok(Self {
            monitor,
            capacity,
            signal,
        })
    }
}

impl<T: Send> BlockingQueue<T> for BoundedQueue<T> {
    fn put(&self, item: T) -> QueueResult<()> {
        let mut ring = self.monitor.lock();
        self.monitor
            .wait_while(&mut ring, Condition::NotFull, &self.signal, RingBuffer::is_full)?;

        if ring.push(item).is_err() {
            unreachable!("ring reported space after wait");
        }
        self.monitor.notify_not_empty();
        Ok(())
    }

    fn take(&self) -> QueueResult<T> {
        let mut ring = self.monitor.lock();
        self.monitor
            .wait_while(&mut ring, Condition::NotEmpty, &self.signal, RingBuffer::is_empty)?;

        let item = match ring.pop() {
            Some(item) => item,
            None => unreachable!("ring reported an item after wait"),
        };
        self.monitor.notify_not_full();
        Ok(item)
    }

    fn try_put(&self, item: T) -> Result<(), T> {
        let mut ring = self.monitor.lock();
        ring.push(item)?;
        self.monitor.notify_not_empty();
        Ok(())
    }

    fn try_take(&self) -> Option<T> {
        let mut ring = self.monitor.lock();
        let item = ring.pop()?;
        self.monitor.notify_not_full();
        Some(item)
    }

    fn wait_not_full(&self, timeout: Duration) -> bool {
        self.monitor
            .wait_for(Condition::NotFull, timeout, &self.signal, |ring| !ring.is_full())
    }

    fn wait_not_empty(&self, timeout: Duration) -> bool {
        self.monitor
            .wait_for(Condition::NotEmpty, timeout, &self.signal, |ring| !ring.is_empty())
    }

    fn size(&self) -> usize {
        self.monitor.lock().count()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn initial_capacity(&self) -> usize {
        self.capacity
    }

    fn is_empty(&self) -> bool {
        self.monitor.lock().is_empty()
    }

    fn is_full(&self) -> bool {
        self.monitor.lock().is_full()
    }

    fn snapshot(&self) -> QueueSnapshot {
        let ring = self.monitor.lock();
        QueueSnapshot {
            size: ring.count(),
            capacity: self.capacity,
            initial_capacity: self.capacity,
            is_empty: ring.is_empty(),
            is_full: ring.is_full(),
        }
    }

    fn shutdown_signal(&self) -> &ShutdownSignal {
        &self.signal
    }
}

impl<T> std::fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedQueue")
            .field("size", &self.monitor.lock().count())
            .field("capacity", &self.capacity)
            .field("signal", &self.signal)
            .finish()
    }
}
