//! # ChatSockets
//!
//! Transport layer for the Sendbird-style chat protocol used by iFunny.
//!
//! The wire format is a single framed text stream: every unit is a
//! 4-character opcode immediately followed by a JSON document
//! (`LOGI{...}`, `PING{...}`, `MESG{...}`). This crate owns everything that
//! is independent of what the frames mean:
//!
//! - **Frame codec**: split/join opcode and JSON payload
//! - **Sequence allocator**: thread-safe request ids for outbound frames
//! - **Session state**: lock-free lifecycle state plus the session key
//! - **Socket client**: WebSocket I/O task, ordered dispatch thread,
//!   reconnection policy, fail-fast sends
//!
//! Interpretation of frames is plugged in through [`FrameHandler`]; outbound
//! frames go through any [`FrameSink`] (the live [`SocketHandle`] or a test
//! double).
//!
//! ## Example
//!
//! ```rust,ignore
//! use chatsockets::{Frame, FrameHandler, SocketClient, SocketConfig};
//!
//! struct Printer;
//!
//! impl FrameHandler for Printer {
//!     fn handle(&mut self, raw: &str) -> chatsockets::Result<()> {
//!         println!("{}", Frame::decode(raw)?.opcode);
//!         Ok(())
//!     }
//! }
//!
//! let client = SocketClient::new();
//! client.start(SocketConfig::new("wss://ws.example.com/?token=..."), Printer)?;
//! client.session().wait_active(Duration::from_secs(10)).await?;
//! ```

pub mod core;
pub mod traits;

// Re-export all traits
pub use traits::*;

// Re-export core client functionality
pub use core::{
    client::{ClientEvent, Metrics, SocketClient, SocketHandle},
    config::SocketConfig,
    connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState},
    frame::{Frame, Opcode, UnknownOpcode, OPCODE_LEN},
    sequence::SequenceAllocator,
    session::SessionState,
};

/// Type alias for Result with SocketError
pub type Result<T> = std::result::Result<T, traits::SocketError>;
