//! Core transport building blocks
//!
//! ```text
//!   server ──text──> I/O task ──crossbeam──> dispatch thread ──> FrameHandler
//!                       ^                                            │
//!                       └──────── mpsc <── SocketHandle <── FrameSink ┘
//! ```
//!
//! The I/O task owns the socket and the reconnect loop. The dispatch thread
//! owns the handler, so frames are handled strictly in arrival order while
//! the socket keeps reading. Outbound frames from any thread go through a
//! cloneable [`SocketHandle`].

pub mod client;
pub mod config;
pub mod connection_state;
pub mod frame;
pub mod sequence;
pub mod session;

// Re-export main types
pub use client::{ClientEvent, Metrics, SocketClient, SocketHandle};
pub use config::SocketConfig;
pub use connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
pub use frame::{Frame, Opcode};
pub use sequence::SequenceAllocator;
pub use session::SessionState;

// Re-export traits for convenience
pub use crate::traits::*;
