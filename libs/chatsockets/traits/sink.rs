//! Outbound frame seam
//!
//! The dispatcher answers `PING` with `PONG` and commands reply in chat;
//! neither should care whether the frame ends up on a live socket or in a
//! test buffer.

use crate::core::frame::Frame;
use crate::error::Result;
use parking_lot::Mutex;

/// Anything that can put an outbound frame on the wire
pub trait FrameSink: Send + Sync {
    /// Queue `frame` for sending
    ///
    /// # Errors
    /// Implementations fail with `SocketError::NotActive` when there is no
    /// live session to send on.
    fn send_frame(&self, frame: &Frame) -> Result<()>;

    /// Allocate a request id for frames that need one (`MESG`, `READ`, ...)
    fn next_request_id(&self) -> u64;
}

/// Sink that keeps every frame in memory
///
/// Used by tests and dry runs; request ids count up from 1.
#[derive(Default)]
pub struct RecordingSink {
    frames: Mutex<Vec<Frame>>,
    next_id: Mutex<u64>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything sent so far
    pub fn frames(&self) -> Vec<Frame> {
        self.frames.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }
}

impl FrameSink for RecordingSink {
    fn send_frame(&self, frame: &Frame) -> Result<()> {
        self.frames.lock().push(frame.clone());
        Ok(())
    }

    fn next_request_id(&self) -> u64 {
        let mut id = self.next_id.lock();
        *id += 1;
        *id
    }
}
