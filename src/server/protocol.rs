//! Line Protocol
//!
//! One command per line, one response line per command. Items are signed
//! 64-bit integers.
//!
//! | Command     | Response                                             |
//! |-------------|------------------------------------------------------|
//! | `PUT <int>` | `OK <size> <capacity>`                               |
//! | `TAKE`      | `OK <item> <size> <capacity>`                        |
//! | `SIZE`      | `OK <size> <capacity> <initial>`                     |
//! | `STATUS`    | `OK <size> <capacity> <initial> <empty> <full>`      |
//! | `QUIT`      | `OK`                                                 |
//!
//! Failures are reported as `ERROR <reason>`.

use std::fmt;
use thiserror::Error;
use crate::queue::QueueSnapshot;

/// Errors raised while decoding protocol lines
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Unknown command")]
    UnknownCommand,

    #[error("Missing item for PUT")]
    MissingItem,

    #[error("Invalid item '{value}': {reason}")]
    InvalidItem { value: String, reason: String },

    #[error("Malformed response: {line}")]
    MalformedResponse { line: String },
}

impl ProtocolError {
    fn malformed(line: &str) -> Self {
        Self::MalformedResponse {
            line: line.to_string(),
        }
    }
}

/// Request sent by a client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Put(i64),
    Take,
    Size,
    Status,
    Quit,
}

impl Command {
    /// Decode one request line. The keyword is matched exactly; anything
    /// after the item of a `PUT` or after a bare keyword is ignored.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (keyword, rest) = match line.split_once(' ') {
            Some((keyword, rest)) => (keyword, Some(rest)),
            None => (line, None),
        };

        match keyword {
            "PUT" => {
                let value = rest
                    .and_then(|rest| rest.split_whitespace().next())
                    .ok_or(ProtocolError::MissingItem)?;
                let item = value.parse::<i64>().map_err(|e| ProtocolError::InvalidItem {
                    value: value.to_string(),
                    reason: e.to_string(),
                })?;
                Ok(Command::Put(item))
            }
            "TAKE" => Ok(Command::Take),
            "SIZE" => Ok(Command::Size),
            "STATUS" => Ok(Command::Status),
            "QUIT" => Ok(Command::Quit),
            _ => Err(ProtocolError::UnknownCommand),
        }
    }

    /// Whether serving this command may suspend on the queue
    pub fn may_block(&self) -> bool {
        matches!(self, Command::Put(_) | Command::Take)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Put(item) => write!(f, "PUT {}", item),
            Command::Take => write!(f, "TAKE"),
            Command::Size => write!(f, "SIZE"),
            Command::Status => write!(f, "STATUS"),
            Command::Quit => write!(f, "QUIT"),
        }
    }
}

/// Reply sent by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Put {
        size: usize,
        capacity: usize,
    },
    Take {
        item: i64,
        size: usize,
        capacity: usize,
    },
    Size {
        size: usize,
        capacity: usize,
        initial_capacity: usize,
    },
    Status(QueueSnapshot),
    Quit,
    Error(String),
}

impl Response {
    pub fn error(reason: impl fmt::Display) -> Self {
        Response::Error(reason.to_string())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error(_))
    }

    /// Decode the reply to `command`
    pub fn parse(command: &Command, line: &str) -> Result<Self, ProtocolError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if let Some(reason) = line.strip_prefix("ERROR") {
            return Ok(Response::Error(reason.trim_start().to_string()));
        }

        let fields: Vec<&str> = line.split(' ').collect();
        let args = match fields.split_first() {
            Some((&"OK", args)) => args,
            _ => return Err(ProtocolError::malformed(line)),
        };

        let count = |index: usize| -> Result<usize, ProtocolError> {
            args.get(index)
                .and_then(|field| field.parse().ok())
                .ok_or_else(|| ProtocolError::malformed(line))
        };
        let flag = |index: usize| -> Result<bool, ProtocolError> {
            args.get(index)
                .and_then(|field| field.parse().ok())
                .ok_or_else(|| ProtocolError::malformed(line))
        };

        let response = match command {
            Command::Put(_) => Response::Put {
                size: count(0)?,
                capacity: count(1)?,
            },
            Command::Take => Response::Take {
                item: args
                    .first()
                    .and_then(|field| field.parse().ok())
                    .ok_or_else(|| ProtocolError::malformed(line))?,
                size: count(1)?,
                capacity: count(2)?,
            },
            Command::Size => Response::Size {
                size: count(0)?,
                capacity: count(1)?,
                initial_capacity: count(2)?,
            },
            Command::Status => Response::Status(QueueSnapshot {
                size: count(0)?,
                capacity: count(1)?,
                initial_capacity: count(2)?,
                is_empty: flag(3)?,
                is_full: flag(4)?,
            }),
            Command::Quit => Response::Quit,
        };
        Ok(response)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Put { size, capacity } => write!(f, "OK {} {}", size, capacity),
            Response::Take {
                item,
                size,
                capacity,
            } => write!(f, "OK {} {} {}", item, size, capacity),
            Response::Size {
                size,
                capacity,
                initial_capacity,
            } => write!(f, "OK {} {} {}", size, capacity, initial_capacity),
            Response::Status(snapshot) => write!(
                f,
                "OK {} {} {} {} {}",
                snapshot.size,
                snapshot.capacity,
                snapshot.initial_capacity,
                snapshot.is_empty,
                snapshot.is_full
            ),
            Response::Quit => write!(f, "OK"),
            Response::Error(reason) => write!(f, "ERROR {}", reason),
        }
    }
}
