//! Server Error Types

use std::io;
use thiserror::Error;
use crate::server::protocol::ProtocolError;

/// Result type for server and client operations
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors raised by the queue service and its client
#[derive(Debug, Error)]
pub enum ServerError {
    /// Listening socket could not be opened
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    /// Socket read or write failed
    #[error("Connection error: {0}")]
    Io(#[from] io::Error),

    /// Blocking queue task did not complete
    #[error("Queue task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Peer sent a line that does not decode
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Peer closed the connection before replying
    #[error("Server closed the connection")]
    Disconnected,
}

impl ServerError {
    pub fn bind(address: impl Into<String>, source: io::Error) -> Self {
        Self::Bind {
            address: address.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_display() {
        let error = ServerError::bind("127.0.0.1:1", io::Error::new(io::ErrorKind::AddrInUse, "in use"));
        assert_eq!(error.to_string(), "Failed to bind 127.0.0.1:1: in use");

        let error: ServerError = ProtocolError::UnknownCommand.into();
        assert_eq!(error.to_string(), "Unknown command");

        assert_eq!(ServerError::Disconnected.to_string(), "Server closed the connection");
    }
}
