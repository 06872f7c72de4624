//! # ChatSockets Traits
//!
//! Seams between the transport and the code that gives frames meaning:
//!
//! - **FrameHandler**: consume inbound raw frames, in order, on the dispatch thread
//! - **FrameSink**: anything that can put an outbound frame on the wire
//! - **ReconnectPolicy**: how the I/O task behaves after an unexpected drop

pub mod error;
pub mod handler;
pub mod reconnect;
pub mod sink;

// Re-export commonly used types
pub use error::{Result, SocketError};
pub use handler::FrameHandler;
pub use reconnect::{ReconnectPolicy, DEFAULT_JITTER_MS};
pub use sink::{FrameSink, RecordingSink};
