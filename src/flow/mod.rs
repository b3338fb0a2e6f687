//! Producer/Consumer Flow Control
//!
//! The loops that sit on either side of a [`BlockingQueue`]:
//!
//! - [`ProducerLoop`] moves a source sequence into a queue, backing off with
//!   a probe phase followed by monitored waiting while the queue is
//!   saturated.
//! - [`ConsumerLoop`] moves items from a queue into a [`Sink`], parking in
//!   timed waits while the queue is empty.
//! - [`Pipeline`] runs N producers and M consumers on dedicated threads and
//!   reports conservation totals.
//!
//! Both loops observe the queue's [`ShutdownSignal`](crate::queue::ShutdownSignal)
//! and never busy-spin: every wait is a timed condition wait on the queue.
//!
//! [`BlockingQueue`]: crate::queue::BlockingQueue

pub mod config;
pub mod consumer;
pub mod error;
pub mod pipeline;
pub mod producer;
pub mod sink;

#[cfg(test)]
mod tests;

pub use config::FlowControlConfig;
pub use consumer::{ConsumerLoop, ConsumerReport, ConsumerState};
pub use error::{FlowError, FlowResult};
pub use pipeline::{split_sources, Pipeline, PipelineSummary};
pub use producer::{ProducerLoop, ProducerReport, ProducerState};
pub use sink::Sink;
