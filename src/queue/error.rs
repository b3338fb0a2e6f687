//! Queue Error Types
//!
//! Defines error types specific to the queue system operations.

use thiserror::Error;

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors that can occur during queue operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// Requested capacity was below the minimum of one slot
    #[error("Invalid capacity {requested}: capacity must be at least 1")]
    InvalidCapacity { requested: i64 },

    /// A blocking operation observed shutdown while suspended
    #[error("Cancelled")]
    Cancelled,
}

impl QueueError {
    /// Create an invalid capacity error
    pub fn invalid_capacity(requested: impl Into<i64>) -> Self {
        Self::InvalidCapacity {
            requested: requested.into(),
        }
    }

    /// Whether this error came from cooperative cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Validate a requested capacity, returning it as a slot count
pub(crate) fn check_capacity(requested: i64) -> QueueResult<usize> {
    if requested < 1 {
        return Err(QueueError::invalid_capacity(requested));
    }
    usize::try_from(requested).map_err(|_| QueueError::invalid_capacity(requested))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_error_creation() {
        let error = QueueError::invalid_capacity(0);
        assert_eq!(error.to_string(), "Invalid capacity 0: capacity must be at least 1");

        let error = QueueError::Cancelled;
        assert_eq!(error.to_string(), "Cancelled");
        assert!(error.is_cancelled());
    }

    #[test]
    fn test_check_capacity() {
        assert_eq!(check_capacity(1).unwrap(), 1);
        assert_eq!(check_capacity(64).unwrap(), 64);
        assert_eq!(check_capacity(0), Err(QueueError::InvalidCapacity { requested: 0 }));
        assert_eq!(check_capacity(-1), Err(QueueError::InvalidCapacity { requested: -1 }));
    }
}
