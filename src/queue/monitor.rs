//! Lock + condition variable pair shared by the queue kinds
//!
//! A `Monitor` owns the queue state behind one mutex and two condition
//! variables. Every suspension point re-checks the shutdown flag, and the
//! monitor registers itself with the queue's `ShutdownSignal` so that a
//! trigger broadcasts to both condition variables while holding the lock.

use std::time::{Duration, Instant};
use parking_lot::{Condvar, Mutex, MutexGuard};
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::shutdown::{ShutdownListener, ShutdownSignal};

/// Which condition a waiter is interested in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Condition {
    NotFull,
    NotEmpty,
}

pub(crate) struct Monitor<S> {
    state: Mutex<S>,
    not_full: Condvar,
    not_empty: Condvar,
}

impl<S> Monitor<S> {
    pub(crate) fn new(state: S) -> Self {
        Self {
            state: Mutex::new(state),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, S> {
        self.state.lock()
    }

    fn condvar(&self, condition: Condition) -> &Condvar {
        match condition {
            Condition::NotFull => &self.not_full,
            Condition::NotEmpty => &self.not_empty,
        }
    }

    /// Suspend while `blocked` holds, releasing the lock while asleep.
    ///
    /// Fails with `Cancelled` only if the caller would have to suspend after
    /// shutdown; state is left untouched in that case.
    pub(crate) fn wait_while<F>(
        &self,
        guard: &mut MutexGuard<'_, S>,
        condition: Condition,
        signal: &ShutdownSignal,
        mut blocked: F,
    ) -> QueueResult<()>
    where
        F: FnMut(&S) -> bool,
    {
        while blocked(&**guard) {
            if signal.is_triggered() {
                return Err(QueueError::Cancelled);
            }
            self.condvar(condition).wait(guard);
        }
        Ok(())
    }

    /// Wait up to `timeout` for `ready` to hold. Returns early, with whatever
    /// `ready` reports, when shutdown is observed.
    pub(crate) fn wait_for<F>(
        &self,
        condition: Condition,
        timeout: Duration,
        signal: &ShutdownSignal,
        mut ready: F,
    ) -> bool
    where
        F: FnMut(&S) -> bool,
    {
        let deadline = Instant::now() + timeout;
        let mut guard = self.state.lock();
        loop {
            if ready(&*guard) {
                return true;
            }
            if signal.is_triggered() {
                return false;
            }
            if self.condvar(condition).wait_until(&mut guard, deadline).timed_out() {
                return ready(&*guard);
            }
        }
    }

    pub(crate) fn notify_not_full(&self) {
        self.not_full.notify_all();
    }

    pub(crate) fn notify_not_empty(&self) {
        self.not_empty.notify_all();
    }
}

impl<S: Send> ShutdownListener for Monitor<S> {
    fn on_shutdown(&self) {
        // Holding the lock orders this broadcast after any waiter's flag check.
        let _guard = self.state.lock();
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }
}
