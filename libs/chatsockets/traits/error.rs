use thiserror::Error;

/// Main error type for chatsockets
#[derive(Error, Debug)]
pub enum SocketError {
    /// Inbound data that is not `OPCODE` + JSON
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// `start` called while the connection is connecting or open
    #[error("Chat is already active")]
    AlreadyActive,

    /// Send or wait on a connection that has not completed the handshake
    #[error("Chat is not active")]
    NotActive,

    /// WebSocket connection error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Connection closed unexpectedly
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// Channel send error
    #[error("Channel send error: {0}")]
    ChannelSend(String),

    /// Timeout error
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Invalid state transition
    #[error("Invalid state transition: {0}")]
    InvalidState(String),

    /// An application hook failed while a frame was being handled
    #[error("Hook failed: {0}")]
    Hook(String),

    /// Spawning the dispatch thread failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for chatsockets operations
pub type Result<T> = std::result::Result<T, SocketError>;
