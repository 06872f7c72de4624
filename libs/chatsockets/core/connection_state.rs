//! Lock-free connection state and counters

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Lifecycle of a chat connection
///
/// ```text
/// Idle ──start──> Connecting ──socket open──> Connected ──LOGI──> Active
///                     ^                          │                  │
///                     └──── drop + reconnect ────┴──────────────────┘
///
/// any ──stop──> Closed          reconnects exhausted ──> Errored
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    Idle = 0,
    /// Transport is being opened (first attempt or reconnect)
    Connecting = 1,
    /// Transport open, handshake not seen yet
    Connected = 2,
    /// Handshake complete; sends are allowed
    Active = 3,
    Closed = 4,
    Errored = 5,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Active,
            4 => Self::Closed,
            5 => Self::Errored,
            _ => Self::Idle,
        }
    }

    /// Connecting, connected or active: `start` must be refused
    pub fn is_running(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected | Self::Active)
    }

    /// Transport currently open
    pub fn is_open(self) -> bool {
        matches!(self, Self::Connected | Self::Active)
    }
}

/// Atomic wrapper around [`ConnectionState`]
#[derive(Debug)]
pub struct AtomicConnectionState {
    inner: AtomicU8,
}

impl AtomicConnectionState {
    pub fn new(state: ConnectionState) -> Self {
        Self {
            inner: AtomicU8::new(state as u8),
        }
    }

    #[inline]
    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.inner.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, state: ConnectionState) {
        self.inner.store(state as u8, Ordering::Release);
    }

    /// Swap in `state`, returning the previous value
    #[inline]
    pub fn replace(&self, state: ConnectionState) -> ConnectionState {
        ConnectionState::from_u8(self.inner.swap(state as u8, Ordering::AcqRel))
    }

    /// Transition `current -> new` only if the state is still `current`
    pub fn compare_exchange(
        &self,
        current: ConnectionState,
        new: ConnectionState,
    ) -> Result<ConnectionState, ConnectionState> {
        self.inner
            .compare_exchange(current as u8, new as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(ConnectionState::from_u8)
            .map_err(ConnectionState::from_u8)
    }

    /// Apply `transition` atomically; `None` leaves the state untouched
    ///
    /// Returns the state observed before the update on success.
    pub fn update<F>(&self, mut transition: F) -> Result<ConnectionState, ConnectionState>
    where
        F: FnMut(ConnectionState) -> Option<ConnectionState>,
    {
        self.inner
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
                transition(ConnectionState::from_u8(raw)).map(|s| s as u8)
            })
            .map(ConnectionState::from_u8)
            .map_err(ConnectionState::from_u8)
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.get() == ConnectionState::Active
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.get().is_open()
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.get().is_running()
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.get() == ConnectionState::Closed
    }
}

impl Default for AtomicConnectionState {
    fn default() -> Self {
        Self::new(ConnectionState::Idle)
    }
}

/// Frame and reconnect counters
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    frames_sent: AtomicU64,
    frames_received: AtomicU64,
    reconnects: AtomicU64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_reconnects(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    pub fn reconnect_count(&self) -> u64 {
        self.reconnects.load(Ordering::Relaxed)
    }
}
