//! Consumer Loop
//!
//! Moves items from a queue into a sink. On an empty queue the consumer
//! parks in timed waits on the queue's not-empty signal and reports at a
//! coarser interval that it is still waiting.
//!
//! On shutdown a consumer facing an empty queue stops at once. Facing a
//! non-empty one it either drains it first or stops, depending on
//! `FlowControlConfig::drain_on_shutdown`.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;
use log::{debug, info, trace};
use crate::flow::config::FlowControlConfig;
use crate::flow::sink::Sink;
use crate::queue::{BlockingQueue, QueueError, ShutdownSignal};

/// Consumer state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Consuming,
    WaitingEmpty { since: Instant, last_report: Instant },
    Draining,
    Done,
}

/// Outcome of one consumer run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumerReport {
    pub name: String,
    /// Items taken and handed to the sink, drained ones included
    pub consumed: usize,
    /// Items taken after shutdown was observed
    pub drained: usize,
    /// Whether a blocking take was cancelled
    pub cancelled: bool,
    /// "Still waiting" reports emitted on an empty queue
    pub status_reports: u32,
}

/// Drives items from a queue into a sink
pub struct ConsumerLoop<T, Q: ?Sized> {
    name: String,
    queue: Arc<Q>,
    config: FlowControlConfig,
    shutdown: ShutdownSignal,
    _item: PhantomData<fn() -> T>,
}

impl<T, Q> ConsumerLoop<T, Q>
where
    Q: BlockingQueue<T> + ?Sized,
{
    /// Create a consumer that stops when the queue's shutdown signal fires
    pub fn new(name: impl Into<String>, queue: Arc<Q>, config: FlowControlConfig) -> Self {
        let shutdown = queue.shutdown_signal().clone();
        Self {
            name: name.into(),
            queue,
            config,
            shutdown,
            _item: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Consume until shutdown
    pub fn run<S>(&self, sink: &S) -> ConsumerReport
    where
        S: Sink<T> + ?Sized,
    {
        let mut report = ConsumerReport {
            name: self.name.clone(),
            ..Default::default()
        };
        let mut state = ConsumerState::Consuming;

        info!("[{}] Started consuming", self.name);
        while state != ConsumerState::Done {
            state = match state {
                ConsumerState::Consuming => self.consume_next(sink, &mut report),
                ConsumerState::WaitingEmpty { since, last_report } => {
                    self.wait_for_items(since, last_report, &mut report)
                }
                ConsumerState::Draining => self.drain_next(sink, &mut report),
                ConsumerState::Done => ConsumerState::Done,
            };
        }

        info!(
            "[{}] Finished consuming. Total items consumed: {}",
            self.name, report.consumed
        );
        report
    }

    fn consume_next<S>(&self, sink: &S, report: &mut ConsumerReport) -> ConsumerState
    where
        S: Sink<T> + ?Sized,
    {
        if self.shutdown.is_triggered() {
            return self.on_shutdown();
        }

        if self.queue.is_empty() {
            let now = Instant::now();
            return ConsumerState::WaitingEmpty {
                since: now,
                last_report: now,
            };
        }

        // another consumer may win the race for this item; take then blocks
        // until the next one or until shutdown
        match self.queue.take() {
            Ok(item) => {
                sink.accept(item);
                report.consumed += 1;
                trace!("[{}] Consumed item (total: {})", self.name, report.consumed);
                ConsumerState::Consuming
            }
            Err(QueueError::Cancelled) => {
                info!("[{}] Interrupted while consuming", self.name);
                report.cancelled = true;
                ConsumerState::Done
            }
            Err(e) => unreachable!("take cannot fail with {}", e),
        }
    }

    fn on_shutdown(&self) -> ConsumerState {
        if self.config.drain_on_shutdown && !self.queue.is_empty() {
            debug!("[{}] Shutdown observed, draining remaining items", self.name);
            ConsumerState::Draining
        } else {
            debug!("[{}] Shutdown observed", self.name);
            ConsumerState::Done
        }
    }

    fn wait_for_items(
        &self,
        since: Instant,
        last_report: Instant,
        report: &mut ConsumerReport,
    ) -> ConsumerState {
        if self.shutdown.is_triggered() {
            return self.on_shutdown();
        }

        if self.queue.wait_not_empty(self.config.wait_slice()) {
            return ConsumerState::Consuming;
        }

        if last_report.elapsed() >= self.config.status_interval() {
            report.status_reports += 1;
            info!(
                "[{}] Queue is still empty, waiting... (elapsed: {} seconds)",
                self.name,
                since.elapsed().as_secs()
            );
            return ConsumerState::WaitingEmpty {
                since,
                last_report: Instant::now(),
            };
        }
        ConsumerState::WaitingEmpty { since, last_report }
    }

    fn drain_next<S>(&self, sink: &S, report: &mut ConsumerReport) -> ConsumerState
    where
        S: Sink<T> + ?Sized,
    {
        match self.queue.try_take() {
            Some(item) => {
                sink.accept(item);
                report.consumed += 1;
                report.drained += 1;
                ConsumerState::Draining
            }
            None => ConsumerState::Done,
        }
    }
}
