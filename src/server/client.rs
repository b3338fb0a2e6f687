//! Queue Client
//!
//! [`QueueClient`] speaks the line protocol to a running server.
//! [`InteractiveSession`] drives a client from a line-oriented terminal:
//! a bare number produces it, `take`/`consume`/`c` consumes one item,
//! `size` and `status` query the queue and `quit`/`exit` leaves.

use log::debug;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use crate::server::error::{ServerError, ServerResult};
use crate::server::protocol::{Command, Response};

/// Connection to a queue server
pub struct QueueClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl QueueClient {
    pub async fn connect(address: &str) -> ServerResult<Self> {
        let stream = TcpStream::connect(address).await?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(reader),
            writer,
        })
    }

    /// Send one command and wait for its reply
    pub async fn send(&mut self, command: Command) -> ServerResult<Response> {
        self.writer
            .write_all(format!("{}\n", command).as_bytes())
            .await?;

        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Err(ServerError::Disconnected);
        }
        debug!("{} -> {}", command, line.trim_end());
        Ok(Response::parse(&command, &line)?)
    }

    /// Send a raw line, returning the raw reply
    pub async fn send_line(&mut self, line: &str) -> ServerResult<String> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;

        let mut reply = String::new();
        if self.reader.read_line(&mut reply).await? == 0 {
            return Err(ServerError::Disconnected);
        }
        Ok(reply.trim_end().to_string())
    }
}

/// One line of user input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientInput {
    Produce(i64),
    Consume,
    Size,
    Status,
    Quit,
    Invalid,
}

impl ClientInput {
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        let keyword = input.to_ascii_lowercase();
        let parsed = match keyword.as_str() {
            "take" | "consume" | "c" => ClientInput::Consume,
            "size" => ClientInput::Size,
            "status" => ClientInput::Status,
            "quit" | "exit" => ClientInput::Quit,
            _ => match input.parse::<i64>() {
                Ok(item) => ClientInput::Produce(item),
                Err(_) => ClientInput::Invalid,
            },
        };
        Some(parsed)
    }
}

/// Items moved by one interactive session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionReport {
    pub produced: usize,
    pub consumed: usize,
}

/// Terminal front-end over a [`QueueClient`]
pub struct InteractiveSession<R, W> {
    client: QueueClient,
    input: R,
    output: W,
    prompt: String,
    report: SessionReport,
    // GREW/SHRANK notices compare against the capacity this session last saw
    last_capacity: Option<usize>,
}

impl<R, W> InteractiveSession<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(client: QueueClient, input: R, output: W) -> Self {
        Self {
            client,
            input,
            output,
            prompt: "flowq> ".to_string(),
            report: SessionReport::default(),
            last_capacity: None,
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Read and execute input lines until `quit` or end of input
    pub async fn run(mut self) -> ServerResult<SessionReport> {
        self.print_help().await?;

        let prompt = self.prompt.clone();
        let mut line = String::new();
        loop {
            self.write(&prompt).await?;
            line.clear();
            if self.input.read_line(&mut line).await? == 0 {
                self.quit().await?;
                break;
            }

            match ClientInput::parse(&line) {
                None => continue,
                Some(ClientInput::Produce(item)) => self.produce(item).await?,
                Some(ClientInput::Consume) => self.consume().await?,
                Some(ClientInput::Size) => self.size().await?,
                Some(ClientInput::Status) => self.status().await?,
                Some(ClientInput::Quit) => {
                    self.quit().await?;
                    break;
                }
                Some(ClientInput::Invalid) => {
                    self.writeln("  Invalid input. Enter a number, 'take', 'size', 'status', or 'quit'")
                        .await?
                }
            }
        }
        Ok(self.report)
    }

    async fn print_help(&mut self) -> ServerResult<()> {
        self.writeln("Commands:").await?;
        self.writeln("  - Enter a number to produce it").await?;
        self.writeln("  - Type 'take' or 'consume' to consume an item").await?;
        self.writeln("  - Type 'size' to check queue size and capacity").await?;
        self.writeln("  - Type 'status' to see queue status").await?;
        self.writeln("  - Type 'quit' to exit").await
    }

    /// Record a capacity seen in a reply, returning the one seen before it
    fn observe_capacity(&mut self, capacity: usize) -> Option<usize> {
        self.last_capacity.replace(capacity)
    }

    async fn produce(&mut self, item: i64) -> ServerResult<()> {
        match self.client.send(Command::Put(item)).await? {
            Response::Put { size, capacity } => {
                self.report.produced += 1;
                let before = self.observe_capacity(capacity);
                self.writeln(&format!(
                    "Produced: {} (queue size: {}, capacity: {})",
                    item, size, capacity
                ))
                .await?;
                if let Some(before) = before.filter(|&before| capacity > before) {
                    self.writeln(&format!("  Queue GREW from {} to {}", before, capacity))
                        .await?;
                }
                if size == capacity {
                    self.writeln("  Queue is now FULL").await?;
                }
                Ok(())
            }
            other => self.print_unexpected(other).await,
        }
    }

    async fn consume(&mut self) -> ServerResult<()> {
        if let Response::Status(snapshot) = self.client.send(Command::Status).await? {
            self.observe_capacity(snapshot.capacity);
            if snapshot.is_empty {
                self.writeln("Queue is EMPTY. Waiting for items...").await?;
            }
        }

        match self.client.send(Command::Take).await? {
            Response::Take {
                item,
                size,
                capacity,
            } => {
                self.report.consumed += 1;
                let before = self.observe_capacity(capacity);
                self.writeln(&format!(
                    "Consumed: {} (queue size: {}, capacity: {}, total consumed: {})",
                    item, size, capacity, self.report.consumed
                ))
                .await?;
                if let Some(before) = before.filter(|&before| capacity < before) {
                    self.writeln(&format!("  Queue SHRANK from {} to {}", before, capacity))
                        .await?;
                }
                if size == 0 {
                    self.writeln("  Queue is now EMPTY").await?;
                }
                Ok(())
            }
            other => self.print_unexpected(other).await,
        }
    }

    async fn size(&mut self) -> ServerResult<()> {
        match self.client.send(Command::Size).await? {
            Response::Size {
                size,
                capacity,
                initial_capacity,
            } => {
                self.observe_capacity(capacity);
                self.writeln(&format!(
                    "  Queue size: {} / {} (initial: {})",
                    size, capacity, initial_capacity
                ))
                .await?;
                if capacity > initial_capacity {
                    self.writeln("  Queue has GROWN from initial capacity").await?;
                }
                Ok(())
            }
            other => self.print_unexpected(other).await,
        }
    }

    async fn status(&mut self) -> ServerResult<()> {
        match self.client.send(Command::Status).await? {
            Response::Status(snapshot) => {
                self.observe_capacity(snapshot.capacity);
                self.writeln(&format!(
                    "  Queue size: {} / {} (initial: {})",
                    snapshot.size, snapshot.capacity, snapshot.initial_capacity
                ))
                .await?;
                self.writeln(&format!("  Is empty: {}", snapshot.is_empty)).await?;
                self.writeln(&format!("  Is full: {}", snapshot.is_full)).await?;
                if snapshot.capacity > snapshot.initial_capacity {
                    self.writeln("  Queue has GROWN from initial capacity").await?;
                }
                Ok(())
            }
            other => self.print_unexpected(other).await,
        }
    }

    async fn quit(&mut self) -> ServerResult<()> {
        // the server may already be gone
        let _ = self.client.send(Command::Quit).await;
        self.writeln(&format!(
            "Client shutting down. Produced {} and consumed {} items total.",
            self.report.produced, self.report.consumed
        ))
        .await
    }

    async fn print_unexpected(&mut self, response: Response) -> ServerResult<()> {
        match response {
            Response::Error(reason) => self.writeln(&format!("  Error: {}", reason)).await,
            other => self.writeln(&format!("  Unexpected reply: {}", other)).await,
        }
    }

    async fn write(&mut self, text: &str) -> ServerResult<()> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.flush().await?;
        Ok(())
    }

    async fn writeln(&mut self, text: &str) -> ServerResult<()> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.write_all(b"\n").await?;
        self.output.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_client_input() {
        assert_eq!(ClientInput::parse("42"), Some(ClientInput::Produce(42)));
        assert_eq!(ClientInput::parse("  -3 \n"), Some(ClientInput::Produce(-3)));
        assert_eq!(ClientInput::parse("take"), Some(ClientInput::Consume));
        assert_eq!(ClientInput::parse("CONSUME"), Some(ClientInput::Consume));
        assert_eq!(ClientInput::parse("c"), Some(ClientInput::Consume));
        assert_eq!(ClientInput::parse("Size"), Some(ClientInput::Size));
        assert_eq!(ClientInput::parse("status"), Some(ClientInput::Status));
        assert_eq!(ClientInput::parse("exit"), Some(ClientInput::Quit));
        assert_eq!(ClientInput::parse("quit"), Some(ClientInput::Quit));
        assert_eq!(ClientInput::parse("hello"), Some(ClientInput::Invalid));
        assert_eq!(ClientInput::parse("   "), None);
    }
}
