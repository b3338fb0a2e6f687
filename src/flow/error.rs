//! Flow Error Types
//!
//! Failures of the orchestration layer. Queue-level failures stay in
//! [`crate::queue::QueueError`] and are handled inside the loops.

use std::io;
use thiserror::Error;

/// Result type for pipeline operations
pub type FlowResult<T> = Result<T, FlowError>;

/// Errors that can occur while running a pipeline
#[derive(Debug, Error)]
pub enum FlowError {
    /// The OS refused to start a worker thread
    #[error("Failed to spawn worker '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },

    /// A worker thread panicked before returning its report
    #[error("Worker '{name}' panicked")]
    WorkerPanicked { name: String },
}

impl FlowError {
    pub fn spawn(name: impl Into<String>, source: io::Error) -> Self {
        Self::Spawn {
            name: name.into(),
            source,
        }
    }

    pub fn worker_panicked(name: impl Into<String>) -> Self {
        Self::WorkerPanicked { name: name.into() }
    }
}
