//! Shutdown & Cancellation Tests
//!
//! One signal shared by several queues and loops: triggering it must wake
//! every suspended caller, cancel only calls that would have to wait, and
//! leave queued items intact for draining.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use parking_lot::Mutex;
use flowq::flow::{ConsumerLoop, FlowControlConfig, Pipeline, ProducerLoop};
use flowq::queue::{BlockingQueue, BoundedQueue, ElasticQueue, QueueError, ShutdownSignal};

#[test]
fn test_shared_signal_wakes_every_queue() {
    let signal = ShutdownSignal::new();
    let full = Arc::new(BoundedQueue::with_shutdown(1, signal.clone()).unwrap());
    let empty = Arc::new(ElasticQueue::<i64>::with_shutdown(2, signal.clone()).unwrap());
    full.put(1).unwrap();

    let blocked_put = {
        let full = Arc::clone(&full);
        thread::spawn(move || full.put(2))
    };
    let blocked_take = {
        let empty = Arc::clone(&empty);
        thread::spawn(move || empty.take())
    };

    thread::sleep(Duration::from_millis(100));
    let started = Instant::now();
    assert!(signal.trigger());

    assert_eq!(blocked_put.join().unwrap(), Err(QueueError::Cancelled));
    assert_eq!(blocked_take.join().unwrap(), Err(QueueError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(1));

    // cancelled calls left the queues untouched
    assert_eq!(full.size(), 1);
    assert!(empty.is_empty());
}

#[test]
fn test_non_blocking_progress_survives_shutdown() {
    let queue = BoundedQueue::new(3).unwrap();
    queue.put(1).unwrap();
    queue.put(2).unwrap();
    queue.shutdown_signal().trigger();

    assert_eq!(queue.put(3), Ok(()));
    assert_eq!(queue.take(), Ok(1));
    assert_eq!(queue.take(), Ok(2));
    assert_eq!(queue.take(), Ok(3));
    assert_eq!(queue.take(), Err(QueueError::Cancelled));
    assert!(!queue.shutdown_signal().trigger(), "second trigger reports no transition");
}

#[test]
fn test_loops_on_one_signal_stop_together() {
    let signal = ShutdownSignal::new();
    let queue = Arc::new(BoundedQueue::<i64>::with_shutdown(1, signal.clone()).unwrap());
    let config = FlowControlConfig::responsive().without_drain();

    let producer = ProducerLoop::new("Producer-1", Arc::clone(&queue), config.clone());
    let producing = thread::spawn(move || producer.run(1..=1000));

    // no consumer yet: the producer fills the queue and backs off
    thread::sleep(Duration::from_millis(150));
    let consumer = ConsumerLoop::new("Consumer-1", Arc::clone(&queue), config);
    let sink = Mutex::new(Vec::new());
    let started = Instant::now();
    signal.trigger();
    let consumer_report = consumer.run(&sink);
    let producer_report = producing.join().unwrap();

    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(producer_report.produced, 1);
    assert!(!producer_report.exhausted);
    assert!(producer_report.full_episodes >= 1);
    assert_eq!(consumer_report.consumed, 0);
    assert_eq!(queue.size(), 1);
}

#[test]
fn test_interrupted_pipeline_stays_conserved() {
    let queue = Arc::new(BoundedQueue::<i64>::new(2).unwrap());
    let pipeline: Pipeline<i64, _> = Pipeline::new(Arc::clone(&queue), FlowControlConfig::responsive());
    let signal = pipeline.shutdown_signal().clone();
    let sink: Arc<Mutex<Vec<i64>>> = Arc::new(Mutex::new(Vec::new()));

    let interrupter = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        signal.trigger();
    });

    // a slow sink keeps the queue saturated until the interrupt
    struct SlowSink(Arc<Mutex<Vec<i64>>>);
    impl flowq::flow::Sink<i64> for SlowSink {
        fn accept(&self, item: i64) {
            thread::sleep(Duration::from_millis(20));
            self.0.lock().push(item);
        }
    }

    let sources = vec![(1..=500).collect::<Vec<i64>>()];
    let summary = pipeline
        .run(sources, 1, Arc::new(SlowSink(Arc::clone(&sink))))
        .unwrap();
    interrupter.join().unwrap();

    assert!(summary.produced < 500);
    assert!(summary.is_conserved());
    assert_eq!(summary.remaining, 0, "consumer drains after shutdown by default");
    assert_eq!(sink.lock().len(), summary.consumed);
}
