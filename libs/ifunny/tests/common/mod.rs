//! Common test utilities for ifunny integration tests
//!
//! Provides a scripted REST transport that counts calls and a scripted chat
//! server.

#![allow(dead_code)]

use async_trait::async_trait;
use ifunny::client::{ApiResponse, Pairs, RestTransport};
use ifunny::{Client, ClientConfig, ClientError, TokenCache};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Notify};

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// One request seen by [`MockRest`]
#[derive(Debug, Clone)]
pub struct Call {
    pub method: &'static str,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub params: Vec<(String, String)>,
}

impl Call {
    pub fn header(&self, name: &str) -> Option<&str> {
        find(&self.headers, name)
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        find(&self.params, name)
    }
}

fn find<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

struct Route {
    method: &'static str,
    suffix: String,
    responses: VecDeque<(u16, Value)>,
}

/// REST transport answering from scripted routes
///
/// A route matches when the method is equal and the URL path ends with its
/// suffix. Responses are served in order; the last one repeats.
#[derive(Default)]
pub struct MockRest {
    routes: Mutex<Vec<Route>>,
    broken: Mutex<Vec<(&'static str, String)>>,
    calls: Mutex<Vec<Call>>,
}

impl MockRest {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn route(&self, method: &'static str, suffix: &str, status: u16, body: Value) {
        let mut routes = self.routes.lock();
        match routes
            .iter_mut()
            .find(|r| r.method == method && r.suffix == suffix)
        {
            Some(route) => route.responses.push_back((status, body)),
            None => routes.push(Route {
                method,
                suffix: suffix.to_string(),
                responses: VecDeque::from([(status, body)]),
            }),
        }
    }

    /// Fail matching requests before any response arrives, like a dropped
    /// connection or an unreadable body
    pub fn break_route(&self, method: &'static str, suffix: &str) {
        self.broken.lock().push((method, suffix.to_string()));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, method: &str, suffix: &str) -> Vec<Call> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.method == method && path_of(&c.url).ends_with(suffix))
            .cloned()
            .collect()
    }

    pub fn count(&self, method: &str, suffix: &str) -> usize {
        self.calls_to(method, suffix).len()
    }

    fn answer(
        &self,
        method: &'static str,
        url: &str,
        headers: &Pairs,
        params: &Pairs,
    ) -> Result<ApiResponse, ClientError> {
        self.calls.lock().push(Call {
            method,
            url: url.to_string(),
            headers: headers.to_vec(),
            params: params.to_vec(),
        });

        let path = path_of(url);
        let broken = self
            .broken
            .lock()
            .iter()
            .any(|(m, suffix)| *m == method && path.ends_with(suffix.as_str()));
        if broken {
            return Err(serde_json::from_str::<Value>("").unwrap_err().into());
        }

        let mut routes = self.routes.lock();
        let route = routes
            .iter_mut()
            .find(|r| r.method == method && path.ends_with(&r.suffix));

        let (status, body) = match route {
            Some(route) if route.responses.len() > 1 => route.responses.pop_front().unwrap(),
            Some(route) => route.responses[0].clone(),
            None => (404, json!({"error": "not_found"})),
        };

        Ok(ApiResponse::new(status, url, body))
    }
}

fn path_of(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

#[async_trait]
impl RestTransport for MockRest {
    async fn get(&self, url: &str, headers: &Pairs, query: &Pairs) -> Result<ApiResponse, ClientError> {
        self.answer("GET", url, headers, query)
    }

    async fn post(&self, url: &str, headers: &Pairs, form: &Pairs) -> Result<ApiResponse, ClientError> {
        self.answer("POST", url, headers, form)
    }
}

pub const EMAIL: &str = "bot@example.com";
pub const PASSWORD: &str = "hunter2";

/// Account payload the mock serves for `GET /account`
pub fn account() -> Value {
    json!({"data": {
        "id": "me-id",
        "nick": "echo_bot",
        "email": EMAIL,
        "messenger_token": "messenger-secret"
    }})
}

/// Config pointing at fake hosts, with no retry delay
pub fn test_config() -> ClientConfig {
    ClientConfig {
        api_base: "https://api.test/v4".to_string(),
        sendbird_api_base: "https://sendbird.test/v3".to_string(),
        auth_retry_delay_secs: 0,
        handshake_timeout_secs: 5,
        reconnect: chatsockets::ReconnectPolicy::Never,
        ..ClientConfig::default()
    }
}

/// Client over `rest` with a token cache in a fresh temp dir
pub fn client_with(config: ClientConfig, rest: Arc<MockRest>) -> (Client, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let cache = TokenCache::open(dir.path().join("config.json")).unwrap();
    (Client::with_transport(config, rest, cache), dir)
}

/// Logged-in client: a cached bearer token the mock accepts
pub async fn logged_in(config: ClientConfig, rest: Arc<MockRest>) -> (Client, TempDir) {
    rest.route("GET", "/account", 200, account());
    let (client, dir) = client_with(config, rest);
    client
        .cache()
        .set(&ifunny::infrastructure::token_key(EMAIL), "cached-bearer")
        .unwrap();
    client.login(EMAIL, PASSWORD, false).await.unwrap();
    (client, dir)
}

/// Chat server sending `script` to every connection and collecting what
/// clients send back
pub struct MockChatServer {
    pub addr: SocketAddr,
    shutdown: Arc<Notify>,
    received: tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>,
}

impl MockChatServer {
    pub async fn start(script: Vec<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let (received_tx, received_rx) = mpsc::unbounded_channel();

        let shutdown_clone = shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        let Ok((stream, _)) = result else { break };
                        let script = script.clone();
                        let received_tx = received_tx.clone();
                        let shutdown = shutdown_clone.clone();
                        tokio::spawn(Self::serve(stream, script, received_tx, shutdown));
                    }
                    _ = shutdown_clone.notified() => break,
                }
            }
        });

        Self {
            addr,
            shutdown,
            received: tokio::sync::Mutex::new(received_rx),
        }
    }

    async fn serve(
        stream: tokio::net::TcpStream,
        script: Vec<String>,
        received_tx: mpsc::UnboundedSender<String>,
        shutdown: Arc<Notify>,
    ) {
        use futures::{SinkExt, StreamExt};
        use tokio_tungstenite::{accept_async, tungstenite::Message};

        let Ok(ws_stream) = accept_async(stream).await else {
            return;
        };
        let (mut write, mut read) = ws_stream.split();

        for frame in script {
            if write.send(Message::Text(frame)).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                msg = read.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        let _ = received_tx.send(text);
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                },
                _ = shutdown.notified() => break,
            }
        }
    }

    /// Value for `ClientConfig::sendbird_ws_base`
    pub fn ws_base(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub async fn next_received(&self, timeout: Duration) -> Option<String> {
        let mut rx = self.received.lock().await;
        tokio::time::timeout(timeout, rx.recv()).await.ok().flatten()
    }
}

impl Drop for MockChatServer {
    fn drop(&mut self) {
        self.shutdown.notify_waiters();
    }
}

pub fn logi(key: &str) -> String {
    format!("LOGI{}", json!({"key": key, "user_id": "me-id"}))
}

/// `MESG` from `guest_id` in channel `chan`
pub fn mesg_from(guest_id: &str, name: &str, text: &str) -> String {
    let payload = json!({
        "msg_id": 1,
        "channel_url": "chan",
        "message": text,
        "user": {"guest_id": guest_id, "name": name}
    });
    format!("MESG{}", payload)
}
