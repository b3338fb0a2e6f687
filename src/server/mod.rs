//! Line-Protocol Queue Service
//!
//! A tokio TCP server exposing one shared [`BlockingQueue`] as text
//! commands, and the client used to drive it interactively.
//!
//! [`BlockingQueue`]: crate::queue::BlockingQueue

pub mod client;
pub mod error;
pub mod protocol;
pub mod service;

pub use client::{ClientInput, InteractiveSession, QueueClient, SessionReport};
pub use error::{ServerError, ServerResult};
pub use protocol::{Command, ProtocolError, Response};
pub use service::{apply, QueueServer, SharedQueue};
