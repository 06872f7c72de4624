use crate::error::Result;

/// Consumer of inbound frames
///
/// A handler is moved onto the connection's dedicated dispatch thread when
/// the client starts. Frames are delivered one at a time in the order the
/// server sent them, so a handshake frame is always seen before anything
/// that depends on it.
///
/// The handler receives the raw text so that decoding errors stay the
/// handler's business: a malformed frame should be logged and dropped, not
/// bubble up and kill the stream.
///
/// **Important**: both methods run on a plain OS thread, not inside the
/// async runtime. Blocking work is fine; `.await` is not available.
pub trait FrameHandler: Send + 'static {
    /// Handle one raw inbound frame
    ///
    /// # Errors
    /// Errors are logged by the dispatch thread, which then continues with
    /// the next frame.
    fn handle(&mut self, raw: &str) -> Result<()>;

    /// Called after the transport dropped (server close, network error or
    /// shutdown). Runs once per lost connection.
    fn on_disconnect(&mut self) -> Result<()> {
        Ok(())
    }
}
