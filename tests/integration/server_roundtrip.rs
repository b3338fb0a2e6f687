//! Queue Server Round-Trip Tests
//!
//! Drives a live server on an ephemeral port through `QueueClient`.

use std::sync::Arc;
use std::time::Duration;
use flowq::queue::{BoundedQueue, ElasticQueue, QueueSnapshot};
use flowq::server::{
    Command, InteractiveSession, QueueClient, QueueServer, Response, ServerError, SessionReport, SharedQueue,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

async fn start(queue: SharedQueue) -> (Arc<QueueServer>, String, JoinHandle<()>) {
    let server = Arc::new(
        QueueServer::bind("127.0.0.1:0", queue)
            .await
            .expect("Failed to bind server"),
    );
    let address = server.local_addr().expect("No local address").to_string();
    let serving = Arc::clone(&server);
    let handle = tokio::spawn(async move {
        serving.serve().await.expect("Server failed");
    });
    (server, address, handle)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_put_take_size_status_quit() {
    let queue: SharedQueue = Arc::new(BoundedQueue::<i64>::new(2).unwrap());
    let (server, address, handle) = start(queue).await;
    let mut client = QueueClient::connect(&address).await.unwrap();

    assert_eq!(client.send(Command::Put(10)).await.unwrap(), Response::Put { size: 1, capacity: 2 });
    assert_eq!(client.send(Command::Put(-4)).await.unwrap(), Response::Put { size: 2, capacity: 2 });
    assert_eq!(
        client.send(Command::Status).await.unwrap(),
        Response::Status(QueueSnapshot {
            size: 2,
            capacity: 2,
            initial_capacity: 2,
            is_empty: false,
            is_full: true,
        })
    );
    assert_eq!(
        client.send(Command::Take).await.unwrap(),
        Response::Take { item: 10, size: 1, capacity: 2 }
    );
    assert_eq!(
        client.send(Command::Take).await.unwrap(),
        Response::Take { item: -4, size: 0, capacity: 2 }
    );
    assert_eq!(
        client.send(Command::Size).await.unwrap(),
        Response::Size { size: 0, capacity: 2, initial_capacity: 2 }
    );
    assert_eq!(client.send(Command::Quit).await.unwrap(), Response::Quit);

    server.close();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("serve did not return after close")
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_malformed_lines_keep_connection_open() {
    let queue: SharedQueue = Arc::new(BoundedQueue::<i64>::new(1).unwrap());
    let (server, address, _handle) = start(queue).await;
    let mut client = QueueClient::connect(&address).await.unwrap();

    assert_eq!(client.send_line("HELLO").await.unwrap(), "ERROR Unknown command");
    assert_eq!(client.send_line("put 1").await.unwrap(), "ERROR Unknown command");
    assert_eq!(client.send_line("PUT").await.unwrap(), "ERROR Missing item for PUT");
    assert!(client.send_line("PUT abc").await.unwrap().starts_with("ERROR Invalid item 'abc'"));
    assert_eq!(client.send_line("PUT 3").await.unwrap(), "OK 1 1");
    assert_eq!(client.send_line("STATUS").await.unwrap(), "OK 1 1 1 false true");

    server.close();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_elastic_queue_reports_growth() {
    let queue: SharedQueue = Arc::new(ElasticQueue::<i64>::new(1).unwrap());
    let (server, address, _handle) = start(queue).await;
    let mut client = QueueClient::connect(&address).await.unwrap();

    assert_eq!(client.send(Command::Put(1)).await.unwrap(), Response::Put { size: 1, capacity: 1 });
    assert_eq!(client.send(Command::Put(2)).await.unwrap(), Response::Put { size: 2, capacity: 2 });
    assert_eq!(client.send(Command::Put(3)).await.unwrap(), Response::Put { size: 3, capacity: 3 });
    assert_eq!(
        client.send(Command::Size).await.unwrap(),
        Response::Size { size: 3, capacity: 3, initial_capacity: 1 }
    );

    server.close();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_blocked_take_served_by_other_client() {
    let queue: SharedQueue = Arc::new(BoundedQueue::<i64>::new(1).unwrap());
    let (server, address, _handle) = start(queue).await;

    let mut consumer = QueueClient::connect(&address).await.unwrap();
    let waiting = tokio::spawn(async move { consumer.send(Command::Take).await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    let mut producer = QueueClient::connect(&address).await.unwrap();
    producer.send(Command::Put(99)).await.unwrap();

    let response = tokio::time::timeout(Duration::from_secs(5), waiting)
        .await
        .expect("TAKE never completed")
        .unwrap()
        .unwrap();
    assert_eq!(response, Response::Take { item: 99, size: 0, capacity: 1 });

    server.close();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_abandoned_take_leaves_items_for_others() {
    let queue: SharedQueue = Arc::new(BoundedQueue::<i64>::new(2).unwrap());
    let (server, address, _handle) = start(Arc::clone(&queue)).await;

    // a client waits on TAKE, then hangs up before anything arrives
    let mut abandoned = TcpStream::connect(&address).await.unwrap();
    abandoned.write_all(b"TAKE\n").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    drop(abandoned);
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut producer = QueueClient::connect(&address).await.unwrap();
    assert_eq!(producer.send(Command::Put(42)).await.unwrap(), Response::Put { size: 1, capacity: 2 });
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(queue.size(), 1, "item claimed by a disconnected client");

    let mut consumer = QueueClient::connect(&address).await.unwrap();
    assert_eq!(
        consumer.send(Command::Take).await.unwrap(),
        Response::Take { item: 42, size: 0, capacity: 2 }
    );

    server.close();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pipelined_lines_after_take_are_answered_in_order() {
    let queue: SharedQueue = Arc::new(BoundedQueue::<i64>::new(2).unwrap());
    let (server, address, _handle) = start(Arc::clone(&queue)).await;

    let stream = TcpStream::connect(&address).await.unwrap();
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    writer.write_all(b"TAKE\nSIZE\n").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut producer = QueueClient::connect(&address).await.unwrap();
    producer.send(Command::Put(5)).await.unwrap();

    let first = tokio::time::timeout(Duration::from_secs(5), lines.next_line())
        .await
        .expect("TAKE never completed")
        .unwrap();
    assert_eq!(first.as_deref(), Some("OK 5 0 2"));
    let second = lines.next_line().await.unwrap();
    assert_eq!(second.as_deref(), Some("OK 0 2 2"));

    server.close();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_close_cancels_blocked_take() {
    let queue: SharedQueue = Arc::new(BoundedQueue::<i64>::new(1).unwrap());
    let (server, address, handle) = start(queue).await;

    let mut blocked = QueueClient::connect(&address).await.unwrap();
    let waiting = tokio::spawn(async move {
        let response = blocked.send(Command::Take).await;
        (response, blocked)
    });
    let mut idle = QueueClient::connect(&address).await.unwrap();
    assert!(matches!(idle.send(Command::Size).await.unwrap(), Response::Size { .. }));

    tokio::time::sleep(Duration::from_millis(100)).await;
    server.close();

    let (response, mut blocked) = tokio::time::timeout(Duration::from_secs(5), waiting)
        .await
        .expect("blocked TAKE was not cancelled")
        .unwrap();
    assert_eq!(response.unwrap(), Response::Error("Cancelled".to_string()));

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("serve did not return after close")
        .unwrap();

    // both connections are closed by the server
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(blocked.send(Command::Size).await.is_err());
    assert!(idle.send(Command::Size).await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_session_reports_resizes_from_its_own_replies() {
    let queue: SharedQueue = Arc::new(ElasticQueue::<i64>::new(1).unwrap());
    let (server, address, _handle) = start(queue).await;
    let client = QueueClient::connect(&address).await.unwrap();

    let mut output = Vec::new();
    let report = InteractiveSession::new(client, &b"1\n2\ntake\ntake\nquit\n"[..], &mut output)
        .run()
        .await
        .unwrap();
    let output = String::from_utf8(output).unwrap();

    assert_eq!(report, SessionReport { produced: 2, consumed: 2 });
    assert!(output.contains("Produced: 2 (queue size: 2, capacity: 2)"));
    assert!(output.contains("Queue GREW from 1 to 2"));
    assert!(output.contains("Consumed: 2 (queue size: 0, capacity: 1, total consumed: 2)"));
    assert!(output.contains("Queue SHRANK from 2 to 1"));
    assert_eq!(output.matches("GREW").count(), 1);
    assert_eq!(output.matches("SHRANK").count(), 1);

    server.close();
}

#[tokio::test]
async fn test_bind_failure_names_address() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = occupied.local_addr().unwrap().to_string();

    let queue: SharedQueue = Arc::new(BoundedQueue::<i64>::new(1).unwrap());
    let error = match QueueServer::bind(&address, queue).await {
        Ok(_) => panic!("binding an occupied port succeeded"),
        Err(error) => error,
    };
    assert!(matches!(error, ServerError::Bind { .. }));
    assert!(error.to_string().contains(&address));
}
