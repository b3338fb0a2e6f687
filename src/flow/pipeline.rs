//! Pipeline Orchestration
//!
//! Runs N producer loops and M consumer loops against one shared queue on
//! dedicated threads. Consumers start first so they are parked on the queue
//! before the first item arrives. Once every producer has returned, the
//! queue's shutdown signal is triggered and consumers finish according to
//! the drain policy.

use std::marker::PhantomData;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use log::{debug, info, warn};
use crate::flow::config::FlowControlConfig;
use crate::flow::consumer::{ConsumerLoop, ConsumerReport};
use crate::flow::error::{FlowError, FlowResult};
use crate::flow::producer::{ProducerLoop, ProducerReport};
use crate::flow::sink::Sink;
use crate::queue::{BlockingQueue, ShutdownSignal};

/// Totals of one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub produced: usize,
    pub consumed: usize,
    /// Items still queued after every worker returned
    pub remaining: usize,
    /// Queue capacity after every worker returned
    pub capacity: usize,
    pub producer_reports: Vec<ProducerReport>,
    pub consumer_reports: Vec<ConsumerReport>,
}

impl PipelineSummary {
    /// Every produced item was either consumed or is still queued
    pub fn is_conserved(&self) -> bool {
        self.produced == self.consumed + self.remaining
    }

    /// Every produced item reached a sink
    pub fn is_complete(&self) -> bool {
        self.remaining == 0 && self.produced == self.consumed
    }
}

/// Split `items` across `producers` sources: equal chunks, with the
/// remainder spread one item each over the first sources.
pub fn split_sources<T>(items: Vec<T>, producers: usize) -> Vec<Vec<T>> {
    if producers == 0 {
        return Vec::new();
    }

    let per_producer = items.len() / producers;
    let remainder = items.len() % producers;
    let mut items = items.into_iter();

    (0..producers)
        .map(|i| {
            let take = per_producer + usize::from(i < remainder);
            items.by_ref().take(take).collect()
        })
        .collect()
}

/// N producers and M consumers around one queue
pub struct Pipeline<T, Q: ?Sized> {
    queue: Arc<Q>,
    config: FlowControlConfig,
    _item: PhantomData<fn(T) -> T>,
}

impl<T, Q> Pipeline<T, Q>
where
    T: Send + 'static,
    Q: BlockingQueue<T> + ?Sized + 'static,
{
    pub fn new(queue: Arc<Q>, config: FlowControlConfig) -> Self {
        Self {
            queue,
            config,
            _item: PhantomData,
        }
    }

    pub fn queue(&self) -> &Arc<Q> {
        &self.queue
    }

    /// Signal that stops every loop of this pipeline
    pub fn shutdown_signal(&self) -> &ShutdownSignal {
        self.queue.shutdown_signal()
    }

    /// Run one producer per source and `consumers` consumers into `sink`.
    ///
    /// Returns once every worker has finished. Triggering the shutdown
    /// signal from elsewhere ends the run early; the summary then reflects
    /// what was moved before that.
    pub fn run<S>(
        &self,
        sources: Vec<Vec<T>>,
        consumers: usize,
        sink: Arc<S>,
    ) -> FlowResult<PipelineSummary>
    where
        S: Sink<T> + ?Sized + 'static,
    {
        let mut consumer_handles = Vec::with_capacity(consumers);
        for i in 1..=consumers {
            let name = format!("Consumer-{}", i);
            let consumer = ConsumerLoop::new(name.clone(), Arc::clone(&self.queue), self.config.clone());
            let sink = Arc::clone(&sink);
            let spawned = thread::Builder::new()
                .name(format!("ConsumerThread-{}", i))
                .spawn(move || consumer.run(&*sink));
            match spawned {
                Ok(handle) => consumer_handles.push((name, handle)),
                Err(e) => return Err(self.abort(FlowError::spawn(name, e), Vec::new(), consumer_handles)),
            }
        }
        info!("Started {} consumer thread(s)", consumers);

        let producers = sources.len();
        let mut producer_handles = Vec::with_capacity(producers);
        for (i, source) in sources.into_iter().enumerate() {
            let name = format!("Producer-{}", i + 1);
            let producer = ProducerLoop::new(name.clone(), Arc::clone(&self.queue), self.config.clone());
            let spawned = thread::Builder::new()
                .name(format!("ProducerThread-{}", i + 1))
                .spawn(move || producer.run(source));
            match spawned {
                Ok(handle) => producer_handles.push((name, handle)),
                Err(e) => {
                    return Err(self.abort(FlowError::spawn(name, e), producer_handles, consumer_handles))
                }
            }
        }
        info!("Started {} producer thread(s)", producers);

        let (producer_reports, producer_failure) = join_all(producer_handles);
        info!("All producers finished");

        self.shutdown_signal().trigger();
        let (consumer_reports, consumer_failure) = join_all(consumer_handles);
        info!("All consumers finished");

        if let Some(error) = producer_failure.or(consumer_failure) {
            return Err(error);
        }

        let snapshot = self.queue.snapshot();
        let summary = PipelineSummary {
            produced: producer_reports.iter().map(|r| r.produced).sum(),
            consumed: consumer_reports.iter().map(|r| r.consumed).sum(),
            remaining: snapshot.size,
            capacity: snapshot.capacity,
            producer_reports,
            consumer_reports,
        };
        debug!(
            "Pipeline summary: produced={} consumed={} remaining={} capacity={}",
            summary.produced, summary.consumed, summary.remaining, summary.capacity
        );
        Ok(summary)
    }

    /// Stop the workers already started and surface the original error
    fn abort(
        &self,
        error: FlowError,
        producers: Vec<(String, JoinHandle<ProducerReport>)>,
        consumers: Vec<(String, JoinHandle<ConsumerReport>)>,
    ) -> FlowError {
        warn!("{}; stopping started workers", error);
        self.shutdown_signal().trigger();
        join_all(producers);
        join_all(consumers);
        error
    }
}

/// Join every handle, keeping the reports of the workers that returned and
/// the first panic
fn join_all<R>(handles: Vec<(String, JoinHandle<R>)>) -> (Vec<R>, Option<FlowError>) {
    let mut reports = Vec::with_capacity(handles.len());
    let mut failure = None;
    for (name, handle) in handles {
        match handle.join() {
            Ok(report) => reports.push(report),
            Err(_) => {
                warn!("Worker {} panicked", name);
                failure.get_or_insert_with(|| FlowError::worker_panicked(name));
            }
        }
    }
    (reports, failure)
}
