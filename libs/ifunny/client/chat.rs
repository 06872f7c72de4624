//! Chat connection lifecycle
//!
//! Wraps the transport-level [`SocketClient`] with what the iFunny side
//! needs: the Sendbird socket URL, the protocol dispatcher wired to the
//! client's hooks and commands, and `MESG` sends tagged with request ids.

use super::error::{ClientError, Result};
use crate::config::ClientConfig;
use crate::events::{CommandTable, EventRegistry, LocalIdentity, ProtocolDispatcher};
use crate::protocol;
use chatsockets::{
    ConnectionState, FrameSink, Metrics, ReconnectPolicy, SessionState, SocketClient, SocketConfig,
};
use parking_lot::RwLock;
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const SOCKET_PLATFORM: &str = "Android";
const SOCKET_PLATFORM_VERSION: &str = "22";
const SOCKET_SDK_VERSION: &str = "3.0.55";

/// Sendbird socket URL for `user_id` authenticated by `messenger_token`
pub fn socket_url(ws_base: &str, app_id: &str, user_id: &str, messenger_token: &str) -> Result<String> {
    let base = format!("{}/", ws_base.trim_end_matches('/'));
    let url = Url::parse_with_params(
        &base,
        &[
            ("p", SOCKET_PLATFORM),
            ("pv", SOCKET_PLATFORM_VERSION),
            ("sv", SOCKET_SDK_VERSION),
            ("ai", app_id),
            ("user_id", user_id),
            ("access_token", messenger_token),
        ],
    )
    .map_err(|e| ClientError::InvalidUrl(e.to_string()))?;

    Ok(url.to_string())
}

pub struct ChatLifecycle {
    socket: SocketClient,
    ws_base: String,
    app_id: String,
    reconnect: ReconnectPolicy,
}

impl ChatLifecycle {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            socket: SocketClient::new(),
            ws_base: config.sendbird_ws_base.clone(),
            app_id: config.sendbird_app_id.clone(),
            reconnect: config.reconnect.clone(),
        }
    }

    /// Open the socket; frames are dispatched to `registry` and `commands`
    ///
    /// Returns once the transport task is running. The connection only
    /// becomes usable after the `LOGI` handshake, see
    /// [`wait_active`](Self::wait_active).
    ///
    /// # Errors
    /// `ChatAlreadyActive` while connecting or connected.
    pub fn start(
        &self,
        identity: LocalIdentity,
        messenger_token: &str,
        registry: Arc<RwLock<EventRegistry>>,
        commands: Arc<RwLock<CommandTable>>,
    ) -> Result<()> {
        if self.state().is_running() {
            return Err(ClientError::ChatAlreadyActive);
        }

        let url = socket_url(&self.ws_base, &self.app_id, &identity.id, messenger_token)?;
        info!(user_id = %identity.id, "Starting chat");

        let dispatcher = ProtocolDispatcher::new(
            Arc::clone(self.socket.session()),
            registry,
            commands,
            identity,
            Arc::new(self.socket.handle()),
        );

        let config = SocketConfig::new(url).reconnect(self.reconnect.clone());
        self.socket.start(config, dispatcher)?;
        Ok(())
    }

    /// Close the socket; idempotent
    pub fn stop(&self) {
        self.socket.stop();
    }

    /// Stop and wait for the transport to wind down
    pub async fn shutdown(&self) {
        self.socket.shutdown().await;
    }

    /// Wait for the handshake
    ///
    /// # Errors
    /// - `ChatNotActive` if the chat is not started or closes while waiting
    /// - `Socket(Timeout)` if no handshake arrives within `timeout`
    pub async fn wait_active(&self, timeout: Duration) -> Result<()> {
        Ok(self.socket.session().wait_active(timeout).await?)
    }

    /// Send `text` to `channel_url`, returning the frame's `req_id`
    pub fn send_message(&self, channel_url: &str, text: &str) -> Result<u64> {
        if !self.is_active() {
            return Err(ClientError::ChatNotActive);
        }

        let req_id = self.socket.next_request_id();
        self.socket
            .send(&protocol::message_frame(channel_url, text, req_id))?;
        Ok(req_id)
    }

    pub fn send(&self, frame: &chatsockets::Frame) -> Result<()> {
        Ok(self.socket.send(frame)?)
    }

    pub fn next_request_id(&self) -> u64 {
        self.socket.next_request_id()
    }

    pub fn session(&self) -> &Arc<SessionState> {
        self.socket.session()
    }

    pub fn session_key(&self) -> Option<String> {
        self.socket.session().session_key()
    }

    /// Outbound side for code running outside the dispatcher
    pub fn sink(&self) -> Arc<dyn FrameSink> {
        Arc::new(self.socket.handle())
    }

    pub fn state(&self) -> ConnectionState {
        self.socket.connection_state()
    }

    /// Handshake completed and the transport is open
    pub fn is_active(&self) -> bool {
        self.socket.session().is_connected()
    }

    pub fn metrics(&self) -> Metrics {
        self.socket.metrics()
    }
}
