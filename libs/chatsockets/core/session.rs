//! Session state shared between the I/O task, the dispatch thread and
//! application threads

use crate::core::connection_state::{AtomicConnectionState, ConnectionState};
use crate::traits::error::{Result, SocketError};
use parking_lot::RwLock;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

/// Session key plus connection lifecycle
///
/// - `connected` (handshake seen) is `state == Active`
/// - `open` (transport up) is `state` in `Connected | Active`
/// - the key is written before the state flips to `Active`, so any reader
///   that observes `connected` also observes a key
///
/// The key survives disconnects: REST calls against the chat backend keep
/// working with the last key until a new handshake replaces it.
#[derive(Debug, Default)]
pub struct SessionState {
    session_key: RwLock<Option<String>>,
    state: AtomicConnectionState,
    changed: Notify,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    pub fn session_key(&self) -> Option<String> {
        self.session_key.read().clone()
    }

    /// Handshake complete
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.state.is_active()
    }

    /// Transport currently open (handshake may still be pending)
    #[inline]
    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    /// Record the handshake: store `key`, then move to `Active`
    ///
    /// Returns `false` when the transport is not open (a handshake that
    /// raced a drop or `stop()`); the key is still kept.
    pub fn establish(&self, key: impl Into<String>) -> bool {
        *self.session_key.write() = Some(key.into());

        let result = self.state.update(|s| match s {
            ConnectionState::Connected | ConnectionState::Active => Some(ConnectionState::Active),
            _ => None,
        });
        self.changed.notify_waiters();

        match result {
            Ok(previous) => {
                debug!(?previous, "Session established");
                true
            }
            Err(current) => {
                debug!(?current, "Handshake received on a connection that is not open");
                false
            }
        }
    }

    /// Wait until the handshake completes
    ///
    /// # Errors
    /// - `SocketError::NotActive` if the connection is idle, closed or
    ///   errored (now or while waiting)
    /// - `SocketError::Timeout` if `timeout` elapses first
    pub async fn wait_active(&self, timeout: Duration) -> Result<()> {
        let wait = async {
            loop {
                let notified = self.changed.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();

                match self.state() {
                    ConnectionState::Active => return Ok(()),
                    ConnectionState::Connecting | ConnectionState::Connected => {}
                    _ => return Err(SocketError::NotActive),
                }

                notified.await;
            }
        };

        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| SocketError::Timeout(format!("no handshake within {:?}", timeout)))?
    }

    /// Claim the connection for a new run
    pub(crate) fn begin_connecting(&self) -> Result<()> {
        self.state
            .update(|s| (!s.is_running()).then_some(ConnectionState::Connecting))
            .map(|_| self.changed.notify_waiters())
            .map_err(|_| SocketError::AlreadyActive)
    }

    pub(crate) fn transport_opened(&self) {
        self.transition_unless_closed(ConnectionState::Connected);
    }

    /// Transport dropped; back to `Connecting` while a reconnect is pending
    pub(crate) fn transport_lost(&self) {
        self.transition_unless_closed(ConnectionState::Connecting);
    }

    /// Reconnects exhausted
    pub(crate) fn fail(&self) {
        self.transition_unless_closed(ConnectionState::Errored);
    }

    /// Move to `Closed` from any state, returning the previous state
    pub(crate) fn close(&self) -> ConnectionState {
        let previous = self.state.replace(ConnectionState::Closed);
        self.changed.notify_waiters();
        previous
    }

    fn transition_unless_closed(&self, next: ConnectionState) {
        let _ = self
            .state
            .update(|s| (s != ConnectionState::Closed).then_some(next));
        self.changed.notify_waiters();
    }
}
