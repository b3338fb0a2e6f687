//! Shutdown Signal
//!
//! One-way shutdown flag shared by queues, flow-control loops and the server.
//! Triggering it sets the flag and then broadcasts to every registered
//! listener, so threads suspended inside a queue wake up and observe it.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use parking_lot::Mutex;

/// Something that must be woken when shutdown is triggered
pub trait ShutdownListener: Send + Sync {
    /// Called once, after the flag is visible as set
    fn on_shutdown(&self);
}

struct SignalInner {
    triggered: AtomicBool,
    listeners: Mutex<Vec<Weak<dyn ShutdownListener>>>,
}

/// Cloneable handle onto a shared shutdown flag
#[derive(Clone)]
pub struct ShutdownSignal {
    inner: Arc<SignalInner>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SignalInner {
                triggered: AtomicBool::new(false),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Whether shutdown has been requested
    pub fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::Acquire)
    }

    /// Request shutdown and wake every registered listener.
    ///
    /// Returns `false` if the signal had already been triggered; listeners are
    /// only notified by the first call.
    pub fn trigger(&self) -> bool {
        if self.inner.triggered.swap(true, Ordering::AcqRel) {
            return false;
        }

        // Collect under the lock, notify outside it: listeners take their own locks.
        let listeners: Vec<Arc<dyn ShutdownListener>> = {
            let mut registered = self.inner.listeners.lock();
            let live = registered.iter().filter_map(Weak::upgrade).collect();
            registered.clear();
            live
        };

        for listener in listeners {
            listener.on_shutdown();
        }
        true
    }

    /// Register a listener to be woken on trigger.
    ///
    /// Only a weak reference is kept. Registering after the signal fired
    /// notifies the listener immediately.
    pub fn register(&self, listener: &Arc<dyn ShutdownListener>) {
        {
            let mut registered = self.inner.listeners.lock();
            if !self.is_triggered() {
                registered.retain(|weak| weak.strong_count() > 0);
                registered.push(Arc::downgrade(listener));
                return;
            }
        }
        listener.on_shutdown();
    }

    /// Number of registered listeners that are still alive
    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Whether two handles refer to the same signal
    pub fn same_as(&self, other: &ShutdownSignal) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownSignal")
            .field("triggered", &self.is_triggered())
            .field("listeners", &self.listener_count())
            .finish()
    }
}
