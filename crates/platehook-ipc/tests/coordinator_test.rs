//! Integration tests for owner election and path forwarding over loopback.

use std::sync::Arc;
use std::time::Duration;

use platehook_ipc::{CoordinatorConfig, InstanceCoordinator};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

/// A port that was free a moment ago.
fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn coordinator(port: u16) -> InstanceCoordinator {
    InstanceCoordinator::new(
        CoordinatorConfig::new(port)
            .with_connect_timeout(Duration::from_millis(500))
            .with_read_timeout(Duration::from_millis(500)),
    )
}

#[tokio::test]
async fn test_exactly_one_owner_among_concurrent_contenders() {
    let port = free_port();
    let contenders: Vec<_> = (0..8).map(|_| Arc::new(coordinator(port))).collect();

    let handles: Vec<_> = contenders
        .iter()
        .cloned()
        .map(|c| std::thread::spawn(move || c.try_acquire_ownership()))
        .collect();
    let owners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|owned| *owned)
        .count();

    assert_eq!(owners, 1);
    assert_eq!(contenders.iter().filter(|c| c.is_owner()).count(), 1);

    for c in &contenders {
        c.stop().await;
    }
}

#[tokio::test]
async fn test_send_before_accept_loop_fails_fast() {
    let port = free_port();
    let owner = coordinator(port);
    assert!(owner.try_acquire_ownership());

    let sender = coordinator(port);
    assert!(!sender.try_acquire_ownership());

    let sent = tokio::time::timeout(Duration::from_secs(2), sender.send_to_owner("/tmp/a.gcode"))
        .await
        .expect("send must not hang");
    assert!(!sent);

    owner.stop().await;
}

#[tokio::test]
async fn test_send_without_owner_fails() {
    let sender = coordinator(free_port());
    assert!(!sender.send_to_owner("/tmp/a.gcode").await);
}

#[tokio::test]
async fn test_messages_delivered_in_order() {
    let port = free_port();
    let owner = coordinator(port);
    assert!(owner.try_acquire_ownership());

    let (tx, mut rx) = mpsc::unbounded_channel();
    owner
        .start_accept_loop(move |message| {
            let _ = tx.send(message);
        })
        .unwrap();

    let sender = coordinator(port);
    let paths: Vec<String> = (0..20).map(|i| format!("/jobs/plate_{i}.gcode")).collect();
    for path in &paths {
        assert!(sender.send_to_owner(path).await);
    }

    let mut received = Vec::new();
    while received.len() < paths.len() {
        let message = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        received.push(message);
    }
    assert_eq!(received, paths);

    owner.stop().await;
}

#[tokio::test]
async fn test_paths_with_spaces_and_unicode_survive() {
    let port = free_port();
    let owner = coordinator(port);
    assert!(owner.try_acquire_ownership());

    let (tx, mut rx) = mpsc::unbounded_channel();
    owner
        .start_accept_loop(move |message| {
            let _ = tx.send(message);
        })
        .unwrap();

    let path = "C:\\Users\\Zoë\\Print Jobs\\dragón v2.gcode";
    assert!(coordinator(port).send_to_owner(path).await);
    assert_eq!(rx.recv().await.unwrap(), path);

    owner.stop().await;
}

#[tokio::test]
async fn test_multiline_message_is_rejected_by_sender() {
    let port = free_port();
    let owner = coordinator(port);
    assert!(owner.try_acquire_ownership());
    owner.start_accept_loop(|_| {}).unwrap();

    assert!(!coordinator(port).send_to_owner("/a.gcode\n/b.gcode").await);

    owner.stop().await;
}

#[tokio::test]
async fn test_stop_releases_port() {
    let port = free_port();
    let owner = coordinator(port);
    assert!(owner.try_acquire_ownership());
    owner.start_accept_loop(|_| {}).unwrap();
    assert!(coordinator(port).send_to_owner("/tmp/a.gcode").await);

    owner.stop().await;
    assert!(!owner.is_owner());
    assert!(!coordinator(port).send_to_owner("/tmp/b.gcode").await);

    let successor = coordinator(port);
    assert!(successor.try_acquire_ownership());
    successor.stop().await;
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let port = free_port();
    let owner = coordinator(port);
    assert!(owner.try_acquire_ownership());
    owner.start_accept_loop(|_| {}).unwrap();

    owner.stop().await;
    owner.stop().await;
    assert!(!owner.is_owner());
}

#[tokio::test]
async fn test_stop_lets_in_flight_read_finish() {
    let port = free_port();
    let owner = Arc::new(coordinator(port));
    assert!(owner.try_acquire_ownership());

    let (tx, mut rx) = mpsc::unbounded_channel();
    owner
        .start_accept_loop(move |message| {
            let _ = tx.send(message);
        })
        .unwrap();

    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    stream.write_all(b"/tmp/ha").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let stopping = tokio::spawn({
        let owner = owner.clone();
        async move { owner.stop().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    stream.write_all(b"lf.gcode").await.unwrap();
    stream.shutdown().await.unwrap();

    stopping.await.unwrap();
    assert_eq!(rx.recv().await.unwrap(), "/tmp/half.gcode");
    assert!(!owner.is_owner());
}

#[tokio::test]
async fn test_silent_sender_does_not_hold_port_after_stop() {
    let port = free_port();
    let owner = InstanceCoordinator::new(
        CoordinatorConfig::new(port).with_read_timeout(Duration::from_millis(200)),
    );
    assert!(owner.try_acquire_ownership());
    owner.start_accept_loop(|_| {}).unwrap();

    let silent = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;
    owner.stop().await;

    let successor = coordinator(port);
    assert!(successor.try_acquire_ownership());
    successor.stop().await;
    drop(silent);
}
