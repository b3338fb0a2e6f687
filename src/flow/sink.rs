//! Consumer destinations

use std::sync::Arc;
use crossbeam_channel::Sender;
use parking_lot::Mutex;

/// Destination for items taken off a queue.
///
/// Implementations must be internally synchronised: several consumer loops
/// may share one sink.
pub trait Sink<T>: Send + Sync {
    fn accept(&self, item: T);
}

impl<T: Send> Sink<T> for Mutex<Vec<T>> {
    fn accept(&self, item: T) {
        self.lock().push(item);
    }
}

impl<T: Send> Sink<T> for Sender<T> {
    fn accept(&self, item: T) {
        if self.send(item).is_err() {
            log::warn!("Sink receiver disconnected, dropping item");
        }
    }
}

impl<T, S: Sink<T> + ?Sized> Sink<T> for Arc<S> {
    fn accept(&self, item: T) {
        (**self).accept(item);
    }
}
