//! Integration tests for reconnection behaviour

mod common;

use chatsockets::{ClientEvent, ConnectionState, ReconnectPolicy, SocketClient, SocketConfig};
use common::{logi, wait_until, AfterScript, MockChatServer, RecordingHandler};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reconnects_after_server_drop() {
    verbose_println!("Testing reconnection after server-side close...");

    let server = MockChatServer::start_with(vec![logi("k")], AfterScript::Drop).await;
    let client = SocketClient::new();
    let (handler, _frames, disconnects) = RecordingHandler::new(Arc::clone(client.session()));

    let config = SocketConfig::new(server.ws_url())
        .reconnect(ReconnectPolicy::fixed(Duration::from_millis(20), None))
        .dispatch_poll(Duration::from_millis(10));
    client.start(config, handler).unwrap();

    assert!(wait_until(Duration::from_secs(5), || client.metrics().reconnect_count >= 2).await);
    assert!(server.connection_count() >= 2);
    assert!(wait_until(Duration::from_secs(5), || disconnects.load(Ordering::SeqCst) >= 1).await);
    verbose_println!("  Reconnects: {}", client.metrics().reconnect_count);

    // the key from the last handshake is kept across drops
    assert_eq!(client.session().session_key().as_deref(), Some("k"));

    let mut saw_reconnecting = false;
    while let Some(event) = client.try_recv_event() {
        if matches!(event, ClientEvent::Reconnecting(_)) {
            saw_reconnecting = true;
        }
    }
    assert!(saw_reconnecting);

    client.shutdown().await;
    assert_eq!(client.connection_state(), ConnectionState::Closed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_gives_up_after_max_attempts() {
    // reserve a port and release it so nothing is listening
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let client = SocketClient::new();
    let (handler, _frames, disconnects) = RecordingHandler::new(Arc::clone(client.session()));

    let config = SocketConfig::new(format!("ws://{}", addr))
        .reconnect(ReconnectPolicy::fixed(Duration::from_millis(10), Some(2)))
        .dispatch_poll(Duration::from_millis(10));
    client.start(config, handler).unwrap();

    assert!(
        wait_until(Duration::from_secs(5), || client.connection_state()
            == ConnectionState::Errored)
        .await
    );
    assert_eq!(client.metrics().reconnect_count, 2);
    // never opened, so no disconnect notification
    assert_eq!(disconnects.load(Ordering::SeqCst), 0);

    client.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_interrupts_reconnect_delay() {
    let server = MockChatServer::start_with(vec![logi("k")], AfterScript::Drop).await;
    let client = SocketClient::new();
    let (handler, _frames, _) = RecordingHandler::new(Arc::clone(client.session()));

    let config = SocketConfig::new(server.ws_url())
        .reconnect(ReconnectPolicy::fixed(Duration::from_secs(30), None))
        .dispatch_poll(Duration::from_millis(10));
    client.start(config, handler).unwrap();

    assert!(wait_until(Duration::from_secs(5), || server.connection_count() == 1).await);
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = std::time::Instant::now();
    client.shutdown().await;
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(server.connection_count(), 1);
}

#[test]
fn test_default_policy_is_bounded_exponential() {
    let policy = ReconnectPolicy::default();
    let jitter = Duration::from_millis(chatsockets::DEFAULT_JITTER_MS);

    let first = policy.next_delay(0).unwrap();
    assert!(first >= Duration::from_secs(1) && first <= Duration::from_secs(1) + jitter);
    let last = policy.next_delay(4).unwrap();
    assert!(last >= Duration::from_secs(16) && last <= Duration::from_secs(16) + jitter);
    assert!(policy.next_delay(5).is_none());
}
