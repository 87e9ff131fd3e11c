//! Async access to a loopback channel through the blocking-pool wrapper.

use loop_serial::{AsyncPortAdapter, BlockingPortWrapper, LoopbackChannel, PortError};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn wrapper_with_capacity(capacity: usize) -> BlockingPortWrapper {
    let channel = LoopbackChannel::builder()
        .port("loop://")
        .capacity(capacity)
        .close_settle(Duration::ZERO)
        .build();
    channel.open().unwrap();
    BlockingPortWrapper::new(Arc::new(channel))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_tasks_echo_large_payload() {
    // Arrange: payload far larger than the queue
    let port = wrapper_with_capacity(32);
    let payload: Vec<u8> = (0..2048u32).map(|i| i as u8).collect();

    // Act
    let reader = {
        let port = port.clone();
        let len = payload.len();
        tokio::spawn(async move { port.read_bytes(len).await })
    };
    let written = port.write_bytes(&payload).await.unwrap();
    let echoed = reader.await.unwrap().unwrap();

    // Assert
    assert_eq!(written, payload.len());
    assert_eq!(echoed, payload);
}

#[tokio::test]
async fn test_close_ends_pending_read() {
    let port = wrapper_with_capacity(8);
    let reader = {
        let port = port.clone();
        tokio::spawn(async move { port.read_bytes(4).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    port.close().await.unwrap();

    let data = tokio::time::timeout(Duration::from_secs(2), reader)
        .await
        .expect("read should finish after close")
        .unwrap()
        .unwrap();
    assert!(data.is_empty());
}

#[tokio::test]
async fn test_read_timeout_through_wrapper() {
    let port = wrapper_with_capacity(8);
    port.set_read_timeout(Some(Duration::from_millis(20)));

    port.write_bytes(b"ab").await.unwrap();
    let data = port.read_bytes(5).await.unwrap();

    assert_eq!(data, b"ab");
}

#[tokio::test]
async fn test_open_through_wrapper() {
    let port = BlockingPortWrapper::open("loop://").await.unwrap();
    assert_eq!(port.name(), "loop://");
    assert_eq!(port.bytes_available().await.unwrap(), 0);

    let err = BlockingPortWrapper::open("loop://?logging=loud").await.unwrap_err();
    assert!(matches!(err, PortError::AddressFormat(_)));
}
