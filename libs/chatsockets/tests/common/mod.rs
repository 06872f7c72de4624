//! Common test utilities for chatsockets integration tests
//!
//! Provides a scripted chat server and a frame handler that records what
//! the dispatch thread delivered.

#![allow(dead_code)]

use chatsockets::{Frame, FrameHandler, Opcode, SessionState};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex, Notify};

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// What the server does after sending its script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterScript {
    /// Keep reading client frames until the client leaves
    Stay,
    /// Close the connection right away
    Drop,
}

/// Mock chat server
///
/// Every accepted connection receives `script` as text frames, in order.
/// Text frames sent by clients are collected and can be read back with
/// [`next_received`](Self::next_received).
pub struct MockChatServer {
    pub addr: SocketAddr,
    shutdown: Arc<Notify>,
    connections: Arc<AtomicUsize>,
    received: Mutex<mpsc::UnboundedReceiver<String>>,
}

impl MockChatServer {
    pub async fn start(script: Vec<String>) -> Self {
        Self::start_with(script, AfterScript::Stay).await
    }

    pub async fn start_with(script: Vec<String>, after: AfterScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let connections = Arc::new(AtomicUsize::new(0));
        let (received_tx, received_rx) = mpsc::unbounded_channel();

        let shutdown_clone = shutdown.clone();
        let connections_clone = connections.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                connections_clone.fetch_add(1, Ordering::SeqCst);
                                let shutdown = shutdown_clone.clone();
                                let script = script.clone();
                                let received_tx = received_tx.clone();
                                tokio::spawn(async move {
                                    Self::handle_connection(stream, script, after, received_tx, shutdown).await;
                                });
                            }
                            Err(e) => {
                                eprintln!("Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = shutdown_clone.notified() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown,
            connections,
            received: Mutex::new(received_rx),
        }
    }

    async fn handle_connection(
        stream: tokio::net::TcpStream,
        script: Vec<String>,
        after: AfterScript,
        received_tx: mpsc::UnboundedSender<String>,
        shutdown: Arc<Notify>,
    ) {
        use futures::{SinkExt, StreamExt};
        use tokio_tungstenite::{accept_async, tungstenite::Message};

        let ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("WebSocket handshake failed: {}", e);
                return;
            }
        };

        let (mut write, mut read) = ws_stream.split();

        for frame in script {
            if write.send(Message::Text(frame)).await.is_err() {
                return;
            }
        }

        if after == AfterScript::Drop {
            let _ = write.close().await;
            return;
        }

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            let _ = received_tx.send(text);
                        }
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                        Some(Ok(_)) => {}
                    }
                }
                _ = shutdown.notified() => {
                    break;
                }
            }
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/?user_id=1&access_token=secret", self.addr)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Next frame a client sent, or `None` after `timeout`
    pub async fn next_received(&self, timeout: Duration) -> Option<String> {
        let mut rx = self.received.lock().await;
        tokio::time::timeout(timeout, rx.recv()).await.ok().flatten()
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockChatServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Handshake frame as the server sends it
pub fn logi(key: &str) -> String {
    format!("LOGI{{\"key\":\"{}\",\"user_id\":\"1\"}}", key)
}

pub fn mesg(text: &str) -> String {
    format!("MESG{{\"message\":\"{}\",\"channel_url\":\"c1\"}}", text)
}

/// Handler that completes the handshake on `LOGI` and records every frame
pub struct RecordingHandler {
    session: Arc<SessionState>,
    frames: crossbeam_channel::Sender<String>,
    disconnects: Arc<AtomicUsize>,
}

impl RecordingHandler {
    pub fn new(
        session: Arc<SessionState>,
    ) -> (Self, crossbeam_channel::Receiver<String>, Arc<AtomicUsize>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let disconnects = Arc::new(AtomicUsize::new(0));
        (
            Self {
                session,
                frames: tx,
                disconnects: disconnects.clone(),
            },
            rx,
            disconnects,
        )
    }
}

impl FrameHandler for RecordingHandler {
    fn handle(&mut self, raw: &str) -> chatsockets::Result<()> {
        let frame = Frame::decode(raw)?;
        if frame.opcode == Opcode::Logi {
            if let Some(key) = frame.str_field("key") {
                self.session.establish(key);
            }
        }
        let _ = self.frames.send(raw.to_string());
        Ok(())
    }

    fn on_disconnect(&mut self) -> chatsockets::Result<()> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Poll `condition` every 10ms until it holds or `timeout` elapses
pub async fn wait_until<F: Fn() -> bool>(timeout: Duration, condition: F) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
