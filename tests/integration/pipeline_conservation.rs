//! Pipeline Conservation Tests
//!
//! Runs full producer/consumer pipelines against both queue kinds and checks
//! that every produced item is either consumed exactly once or still queued.

use std::collections::HashSet;
use std::sync::Arc;
use parking_lot::Mutex;
use flowq::config::{QueueKind, QueueSettings};
use flowq::flow::{split_sources, FlowControlConfig, Pipeline};
use flowq::queue::ShutdownSignal;

fn run_pipeline(
    kind: QueueKind,
    capacity: i64,
    producers: usize,
    consumers: usize,
    items: usize,
) -> (flowq::flow::PipelineSummary, Vec<i64>) {
    let settings = QueueSettings { kind, capacity };
    let queue = settings
        .build::<i64>(ShutdownSignal::new())
        .expect("Failed to build queue");
    let sink: Arc<Mutex<Vec<i64>>> = Arc::new(Mutex::new(Vec::new()));

    let source: Vec<i64> = (1..=items as i64).collect();
    let summary = Pipeline::new(queue, FlowControlConfig::responsive())
        .run(split_sources(source, producers), consumers, Arc::clone(&sink))
        .expect("Pipeline run failed");

    let consumed = sink.lock().clone();
    (summary, consumed)
}

#[test]
fn test_bounded_pipeline_delivers_each_item_once() {
    let (summary, consumed) = run_pipeline(QueueKind::Bounded, 5, 2, 2, 40);

    assert!(summary.is_conserved());
    assert!(summary.is_complete());
    assert_eq!(summary.produced, 40);
    assert_eq!(consumed.len(), 40);

    let unique: HashSet<i64> = consumed.iter().copied().collect();
    assert_eq!(unique.len(), 40, "an item was consumed twice");
    assert_eq!(unique, (1..=40).collect::<HashSet<i64>>());
}

#[test]
fn test_elastic_pipeline_returns_to_initial_capacity() {
    let (summary, consumed) = run_pipeline(QueueKind::Elastic, 2, 4, 1, 60);

    assert!(summary.is_complete());
    assert_eq!(consumed.len(), 60);
    assert_eq!(summary.capacity, 2);
    assert_eq!(summary.remaining, 0);
}

#[test]
fn test_uneven_split_and_more_consumers_than_items() {
    let (summary, consumed) = run_pipeline(QueueKind::Bounded, 1, 3, 6, 7);

    let per_producer: Vec<usize> = summary.producer_reports.iter().map(|r| r.produced).collect();
    assert_eq!(per_producer, vec![3, 2, 2]);
    assert_eq!(summary.consumer_reports.len(), 6);
    assert_eq!(consumed.len(), 7);
    assert!(summary.is_complete());
}

#[test]
fn test_per_producer_order_survives_single_consumer() {
    let (_, consumed) = run_pipeline(QueueKind::Bounded, 3, 2, 1, 30);

    // producer 1 owns 1..=15, producer 2 owns 16..=30
    let first: Vec<i64> = consumed.iter().copied().filter(|&i| i <= 15).collect();
    let second: Vec<i64> = consumed.iter().copied().filter(|&i| i > 15).collect();
    assert_eq!(first, (1..=15).collect::<Vec<i64>>());
    assert_eq!(second, (16..=30).collect::<Vec<i64>>());
}

#[test]
fn test_empty_sources_finish_immediately() {
    let (summary, consumed) = run_pipeline(QueueKind::Elastic, 4, 2, 2, 0);

    assert_eq!(summary.produced, 0);
    assert!(consumed.is_empty());
    assert!(summary.is_complete());
    assert_eq!(summary.capacity, 4);
}
