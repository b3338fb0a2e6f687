//! Queue Service
//!
//! Exposes one shared queue over TCP using the line protocol. Each
//! connection is served by its own task; commands that may suspend on the
//! queue (`PUT`, `TAKE`) run on tokio's blocking pool so a waiting client
//! never stalls the runtime.
//!
//! Lifecycle is `bind` → `serve` → `close`. Closing triggers the queue's
//! shutdown signal: blocked `PUT`/`TAKE` handlers answer `ERROR Cancelled`,
//! idle connections are dropped and `serve` returns.
//!
//! A waiting `TAKE` is tied to its connection: an item is only removed while
//! the client is still there, and one whose reply cannot be written is put
//! back.

use std::net::SocketAddr;
use std::sync::Arc;
use log::{debug, info, warn};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task;
use crate::queue::{BlockingQueue, QueueError, ShutdownListener, ShutdownSignal};
use crate::server::error::{ServerError, ServerResult};
use crate::server::protocol::{Command, Response};

/// Longest single wait on the blocking pool while serving TAKE
const TAKE_WAIT_SLICE: Duration = Duration::from_millis(250);

/// Queue shared by every connection
pub type SharedQueue = Arc<dyn BlockingQueue<i64>>;

/// Bridges the queue's shutdown signal into the async world
struct ShutdownBridge {
    sender: watch::Sender<bool>,
}

impl ShutdownListener for ShutdownBridge {
    fn on_shutdown(&self) {
        self.sender.send_replace(true);
    }
}

/// TCP front-end for a shared queue
pub struct QueueServer {
    listener: TcpListener,
    queue: SharedQueue,
    bridge: Arc<ShutdownBridge>,
}

impl QueueServer {
    /// Bind the listening socket. Port 0 picks a free port.
    pub async fn bind(address: &str, queue: SharedQueue) -> ServerResult<Self> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|e| ServerError::bind(address, e))?;

        let (sender, _) = watch::channel(false);
        let bridge = Arc::new(ShutdownBridge { sender });
        let listener_handle: Arc<dyn ShutdownListener> = bridge.clone();
        queue.shutdown_signal().register(&listener_handle);

        Ok(Self {
            listener,
            queue,
            bridge,
        })
    }

    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn queue(&self) -> &SharedQueue {
        &self.queue
    }

    pub fn shutdown_signal(&self) -> &ShutdownSignal {
        self.queue.shutdown_signal()
    }

    /// Accept connections until the server is closed
    pub async fn serve(&self) -> ServerResult<()> {
        let mut stopped = self.bridge.sender.subscribe();
        let snapshot = self.queue.snapshot();
        info!(
            "Queue server listening on {} (capacity: {}, initial: {})",
            self.local_addr()?,
            snapshot.capacity,
            snapshot.initial_capacity
        );

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        info!("Client connected: {}", peer);
                        let queue = Arc::clone(&self.queue);
                        let stopped = self.bridge.sender.subscribe();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, queue, stopped).await {
                                warn!("Error handling client {}: {}", peer, e);
                            }
                            info!("Client disconnected: {}", peer);
                        });
                    }
                    Err(e) => warn!("Error accepting client: {}", e),
                },
                _ = stopped.wait_for(|stopped| *stopped) => break,
            }
        }

        info!("Queue server shutting down");
        Ok(())
    }

    /// Stop accepting and cancel every blocked queue operation
    pub fn close(&self) {
        if self.shutdown_signal().trigger() {
            debug!("Queue server close requested");
        }
    }
}

/// How a connection-scoped TAKE ended
enum TakeOutcome {
    Taken(i64),
    Cancelled,
    PeerClosed,
}

/// Serve one client until it quits, disconnects, or the server closes
async fn handle_connection(
    stream: TcpStream,
    queue: SharedQueue,
    mut stopped: watch::Receiver<bool>,
) -> ServerResult<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let read = tokio::select! {
            read = reader.read_line(&mut line) => read?,
            _ = stopped.wait_for(|stopped| *stopped) => break,
        };
        if read == 0 {
            break;
        }

        let (response, keep_open) = match Command::parse(&line) {
            Ok(Command::Take) => {
                debug!("Command: {}", Command::Take);
                match take_while_connected(&queue, &mut reader, &mut stopped).await? {
                    TakeOutcome::Taken(item) => {
                        let snapshot = queue.snapshot();
                        let response = Response::Take {
                            item,
                            size: snapshot.size,
                            capacity: snapshot.capacity,
                        };
                        if let Err(e) = writer.write_all(format!("{}\n", response).as_bytes()).await {
                            restore(&queue, item).await;
                            return Err(e.into());
                        }
                        continue;
                    }
                    TakeOutcome::Cancelled => (Response::error(QueueError::Cancelled), false),
                    TakeOutcome::PeerClosed => {
                        debug!("Client closed the connection while waiting for TAKE");
                        break;
                    }
                }
            }
            Ok(command) => {
                debug!("Command: {}", command);
                match execute(&queue, command).await? {
                    Ok(response) => {
                        let keep_open = command != Command::Quit;
                        (response, keep_open)
                    }
                    Err(e) => {
                        let keep_open = !e.is_cancelled();
                        (Response::error(e), keep_open)
                    }
                }
            }
            Err(e) => (Response::error(e), true),
        };

        writer.write_all(format!("{}\n", response).as_bytes()).await?;
        if !keep_open {
            break;
        }
    }

    writer.shutdown().await.ok();
    Ok(())
}

/// Wait for an item on the blocking pool in short slices, removing one only
/// while the client is still connected.
///
/// An item is taken with `try_take` after a slice reports one available, so
/// a client that disconnects mid-wait never claims an item. After shutdown a
/// queued item is still handed out; an empty queue yields `Cancelled`.
async fn take_while_connected(
    queue: &SharedQueue,
    reader: &mut BufReader<OwnedReadHalf>,
    stopped: &mut watch::Receiver<bool>,
) -> ServerResult<TakeOutcome> {
    let mut watch_peer = true;
    loop {
        if let Some(item) = queue.try_take() {
            return Ok(TakeOutcome::Taken(item));
        }
        if queue.shutdown_signal().is_triggered() {
            return Ok(TakeOutcome::Cancelled);
        }

        let waiting = Arc::clone(queue);
        let wait = task::spawn_blocking(move || waiting.wait_not_empty(TAKE_WAIT_SLICE));

        tokio::select! {
            waited = wait => {
                waited?;
            }
            // pipelined input means the peer is alive; stop watching until the next TAKE
            closed = peer_closed(reader), if watch_peer => match closed {
                Ok(true) | Err(_) => return Ok(TakeOutcome::PeerClosed),
                Ok(false) => watch_peer = false,
            },
            _ = stopped.wait_for(|stopped| *stopped) => {}
        }
    }
}

/// Resolves once the peer has sent more input (`false`) or hung up (`true`)
async fn peer_closed(reader: &mut BufReader<OwnedReadHalf>) -> std::io::Result<bool> {
    Ok(reader.fill_buf().await?.is_empty())
}

/// Return an item whose reply could not be delivered.
///
/// The item goes back at the tail, so it loses its place in FIFO order.
async fn restore(queue: &SharedQueue, item: i64) {
    let item = match queue.try_put(item) {
        Ok(()) => {
            debug!("Returned undelivered item {} to the queue", item);
            return;
        }
        Err(item) => item,
    };

    let returning = Arc::clone(queue);
    match task::spawn_blocking(move || returning.put(item)).await {
        Ok(Ok(())) => debug!("Returned undelivered item {} to the queue", item),
        Ok(Err(e)) => warn!("Undelivered item {} could not be returned: {}", item, e),
        Err(e) => warn!("Undelivered item {} could not be returned: {}", item, e),
    }
}

/// Run one command, moving those that may suspend onto the blocking pool
async fn execute(queue: &SharedQueue, command: Command) -> ServerResult<Result<Response, QueueError>> {
    if command.may_block() {
        let queue = Arc::clone(queue);
        Ok(task::spawn_blocking(move || apply(queue.as_ref(), command)).await?)
    } else {
        Ok(apply(queue.as_ref(), command))
    }
}

/// Apply a command to the queue and build its reply
pub fn apply(queue: &dyn BlockingQueue<i64>, command: Command) -> Result<Response, QueueError> {
    let response = match command {
        Command::Put(item) => {
            queue.put(item)?;
            let snapshot = queue.snapshot();
            Response::Put {
                size: snapshot.size,
                capacity: snapshot.capacity,
            }
        }
        Command::Take => {
            let item = queue.take()?;
            let snapshot = queue.snapshot();
            Response::Take {
                item,
                size: snapshot.size,
                capacity: snapshot.capacity,
            }
        }
        Command::Size => {
            let snapshot = queue.snapshot();
            Response::Size {
                size: snapshot.size,
                capacity: snapshot.capacity,
                initial_capacity: snapshot.initial_capacity,
            }
        }
        Command::Status => Response::Status(queue.snapshot()),
        Command::Quit => Response::Quit,
    };
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{BoundedQueue, ElasticQueue};

    #[test]
    fn test_apply_reports_queue_state() {
        let queue = ElasticQueue::<i64>::new(2).unwrap();

        assert_eq!(apply(&queue, Command::Put(1)), Ok(Response::Put { size: 1, capacity: 2 }));
        assert_eq!(apply(&queue, Command::Put(2)), Ok(Response::Put { size: 2, capacity: 2 }));
        assert_eq!(apply(&queue, Command::Put(3)), Ok(Response::Put { size: 3, capacity: 4 }));
        assert_eq!(
            apply(&queue, Command::Size),
            Ok(Response::Size { size: 3, capacity: 4, initial_capacity: 2 })
        );
        assert_eq!(
            apply(&queue, Command::Take),
            Ok(Response::Take { item: 1, size: 2, capacity: 4 })
        );
        assert_eq!(
            apply(&queue, Command::Take),
            Ok(Response::Take { item: 2, size: 1, capacity: 2 })
        );
        assert_eq!(apply(&queue, Command::Quit), Ok(Response::Quit));
    }

    #[test]
    fn test_apply_status_line() {
        let queue = BoundedQueue::<i64>::new(1).unwrap();
        apply(&queue, Command::Put(7)).unwrap();
        let response = apply(&queue, Command::Status).unwrap();
        assert_eq!(response.to_string(), "OK 1 1 1 false true");
    }

    #[test]
    fn test_apply_cancelled_after_shutdown() {
        let queue = BoundedQueue::<i64>::new(1).unwrap();
        queue.shutdown_signal().trigger();
        assert_eq!(apply(&queue, Command::Take), Err(QueueError::Cancelled));
        assert_eq!(
            Response::error(QueueError::Cancelled).to_string(),
            "ERROR Cancelled"
        );
    }
}
