//! Producer Loop
//!
//! Moves items from a source sequence into a queue. When the queue is
//! saturated the producer backs off in two phases:
//!
//! 1. **probing**: short timed checks for up to the probe window, resuming
//!    as soon as the queue size drops below what it was on entry;
//! 2. **monitoring**: timed waits on the queue's not-full signal with a
//!    periodic progress report, resuming as soon as there is room.
//!
//! Shutdown is honoured in every state; unproduced items are abandoned.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;
use log::{debug, info, trace};
use crate::flow::config::FlowControlConfig;
use crate::queue::{BlockingQueue, QueueError, ShutdownSignal};

/// Producer state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerState {
    Producing,
    ProbingFull { entered: Instant, size_at_entry: usize },
    MonitoringFull { last_report: Instant },
    Done,
}

/// Outcome of one producer run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProducerReport {
    pub name: String,
    /// Items successfully put
    pub produced: usize,
    /// Whether the source was fully consumed
    pub exhausted: bool,
    /// Whether a blocking put was cancelled
    pub cancelled: bool,
    /// Number of times the producer found the queue saturated
    pub full_episodes: u32,
    /// Progress reports emitted while monitoring a full queue
    pub status_reports: u32,
}

/// Drives items from a source into a queue
pub struct ProducerLoop<T, Q: ?Sized> {
    name: String,
    queue: Arc<Q>,
    config: FlowControlConfig,
    shutdown: ShutdownSignal,
    _item: PhantomData<fn(T)>,
}

impl<T, Q> ProducerLoop<T, Q>
where
    Q: BlockingQueue<T> + ?Sized,
{
    /// Create a producer that stops when the queue's shutdown signal fires
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

    /// Produce every item of `source` unless shutdown intervenes
    pub fn run<I>(&self, source: I) -> ProducerReport
    where
        I: IntoIterator<Item = T>,
    {
        let mut source = source.into_iter().peekable();
        let mut report = ProducerReport {
            name: self.name.clone(),
            ..Default::default()
        };
        let mut state = ProducerState::Producing;

        info!("[{}] Started producing", self.name);
        while state != ProducerState::Done {
            state = if self.shutdown.is_triggered() {
                debug!("[{}] Shutdown observed", self.name);
                ProducerState::Done
            } else {
                match state {
                    ProducerState::Producing => {
                        if source.peek().is_none() {
                            ProducerState::Done
                        } else if self.queue.is_saturated() {
                            self.enter_probing(&mut report)
                        } else {
                            self.produce_next(&mut source, &mut report)
                        }
                    }
                    ProducerState::ProbingFull { entered, size_at_entry } => {
                        self.probe(entered, size_at_entry, &mut report)
                    }
                    ProducerState::MonitoringFull { last_report } => {
                        self.monitor(last_report, &mut report)
                    }
                    ProducerState::Done => ProducerState::Done,
                }
            };
        }

        report.exhausted = source.peek().is_none();
        info!(
            "[{}] Finished producing. Total items produced: {}",
            self.name, report.produced
        );
        report
    }

    fn produce_next<I>(&self, source: &mut I, report: &mut ProducerReport) -> ProducerState
    where
        I: Iterator<Item = T>,
    {
        let Some(item) = source.next() else {
            return ProducerState::Done;
        };
        match self.queue.put(item) {
            Ok(()) => {
                report.produced += 1;
                trace!("[{}] Produced item {}", self.name, report.produced);
                ProducerState::Producing
            }
            Err(QueueError::Cancelled) => {
                info!("[{}] Interrupted while producing", self.name);
                report.cancelled = true;
                ProducerState::Done
            }
            Err(e) => unreachable!("put cannot fail with {}", e),
        }
    }

    fn enter_probing(&self, report: &mut ProducerReport) -> ProducerState {
        let size_at_entry = self.queue.size();
        report.full_episodes += 1;
        info!(
            "[{}] Queue is full (size: {}), monitoring for {} seconds...",
            self.name,
            size_at_entry,
            self.config.probe_window().as_secs()
        );
        ProducerState::ProbingFull {
            entered: Instant::now(),
            size_at_entry,
        }
    }

    fn probe(
        &self,
        entered: Instant,
        size_at_entry: usize,
        report: &mut ProducerReport,
    ) -> ProducerState {
        let size = self.queue.size();
        if size < size_at_entry || !self.queue.is_saturated() {
            debug!(
                "[{}] Queue size decreased (from {} to {}), resuming production",
                self.name, size_at_entry, size
            );
            return ProducerState::Producing;
        }

        let elapsed = entered.elapsed();
        let window = self.config.probe_window();
        if elapsed >= window {
            report.status_reports += 1;
            info!(
                "[{}] Queue is full, waiting for consumers... (size: {}, capacity: {}, unchanged for {} seconds)",
                self.name,
                size,
                self.queue.capacity(),
                elapsed.as_secs()
            );
            return ProducerState::MonitoringFull {
                last_report: Instant::now(),
            };
        }

        let slice = self.config.probe_interval().min(window - elapsed);
        self.queue.wait_not_full(slice);
        ProducerState::ProbingFull {
            entered,
            size_at_entry,
        }
    }

    fn monitor(&self, last_report: Instant, report: &mut ProducerReport) -> ProducerState {
        if self.queue.wait_not_full(self.config.wait_slice()) {
            info!("[{}] Queue has space, resuming production", self.name);
            return ProducerState::Producing;
        }

        if last_report.elapsed() >= self.config.status_interval() {
            report.status_reports += 1;
            info!(
                "[{}] Queue is still full, waiting for consumers... (size: {}, capacity: {})",
                self.name,
                self.queue.size(),
                self.queue.capacity()
            );
            return ProducerState::MonitoringFull {
                last_report: Instant::now(),
            };
        }
        ProducerState::MonitoringFull { last_report }
    }
}
