//! Blocking Queues for Producer/Consumer Coordination
//!
//! This module provides the thread-safe buffers that sit between producers
//! and consumers. Two kinds share one contract, [`BlockingQueue`]:
//!
//! - **BoundedQueue**: fixed capacity; `put` suspends while full.
//! - **ElasticQueue**: grows by its initial capacity when full and snaps back
//!   to the initial capacity once usage drops below it; `put` never suspends.
//!
//! Both keep their ring, cursors and count behind a single lock with
//! `not_full` / `not_empty` condition variables. Cancellation is cooperative:
//! every queue observes a [`ShutdownSignal`], and a blocking call that would
//! have to suspend after shutdown fails with [`QueueError::Cancelled`].
//!
//! # Usage
//!
//! ```rust
//! use flowq::queue::{BlockingQueue, ElasticQueue};
//!
//! let queue = ElasticQueue::new(2).unwrap();
//! for item in 0..3 {
//!     queue.put(item).unwrap();
//! }
//! assert_eq!(queue.capacity(), 4);
//! assert_eq!(queue.take().unwrap(), 0);
//! // two items left, below the initial capacity: snapped back
//! assert_eq!(queue.capacity(), 2);
//! ```

pub mod bounded;
pub mod elastic;
pub mod error;
pub mod ring;
pub mod shutdown;
mod monitor;

#[cfg(test)]
mod tests;

use std::time::Duration;

pub use bounded::BoundedQueue;
pub use elastic::ElasticQueue;
pub use error::{QueueError, QueueResult};
pub use ring::RingBuffer;
pub use shutdown::{ShutdownListener, ShutdownSignal};

/// Point-in-time view of a queue, taken under one lock acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub size: usize,
    pub capacity: usize,
    pub initial_capacity: usize,
    pub is_empty: bool,
    pub is_full: bool,
}

/// Grow/shrink counters for an elastic queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResizeStats {
    pub grows: u64,
    pub shrinks: u64,
}

/// Contract shared by the bounded and elastic queues
pub trait BlockingQueue<T>: Send + Sync {
    /// Insert an item, suspending while the queue cannot accept it
    fn put(&self, item: T) -> QueueResult<()>;

    /// Remove the oldest item, suspending while the queue is empty
    fn take(&self) -> QueueResult<T>;

    /// Insert without suspending; hands the item back if it would block
    fn try_put(&self, item: T) -> Result<(), T>;

    /// Remove without suspending
    fn try_take(&self) -> Option<T>;

    /// Wait up to `timeout` until a `put` would not suspend.
    /// Returns whether that is the case when the wait ends.
    fn wait_not_full(&self, timeout: Duration) -> bool;

    /// Wait up to `timeout` until an item is available.
    /// Returns whether that is the case when the wait ends.
    fn wait_not_empty(&self, timeout: Duration) -> bool;

    fn size(&self) -> usize;

    fn capacity(&self) -> usize;

    /// Capacity the queue was created with
    fn initial_capacity(&self) -> usize;

    fn is_empty(&self) -> bool;

    fn is_full(&self) -> bool;

    /// Whether a `put` issued now would suspend
    fn is_saturated(&self) -> bool {
        self.is_full()
    }

    fn snapshot(&self) -> QueueSnapshot;

    /// The signal this queue observes for cancellation
    fn shutdown_signal(&self) -> &ShutdownSignal;
}
