use crate::core::config::SocketConfig;
use crate::core::connection_state::{AtomicMetrics, ConnectionState};
use crate::core::frame::Frame;
use crate::core::sequence::SequenceAllocator;
use crate::core::session::SessionState;
use crate::traits::*;
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Capacity of the lifecycle event queue; new events are dropped while it
/// is full
const EVENT_QUEUE_CAPACITY: usize = 256;

/// Commands from handles to the I/O task
#[derive(Debug)]
enum ClientCommand {
    /// Write an already encoded frame
    Send(String),
    /// Close the socket and stop the task
    Shutdown,
}

/// Messages from the I/O task to the dispatch thread
#[derive(Debug)]
enum Inbound {
    Opened,
    Frame(String),
    Disconnected,
}

/// Lifecycle notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Transport open
    Connected,
    /// Transport closed
    Disconnected,
    /// Reconnecting (attempt number)
    Reconnecting(usize),
    /// Error occurred
    Error(String),
}

/// Client metrics snapshot
#[derive(Debug, Clone)]
pub struct Metrics {
    pub frames_sent: u64,
    pub frames_received: u64,
    pub reconnect_count: u64,
    pub connection_state: ConnectionState,
}

type OutboundSlot = Arc<Mutex<Option<mpsc::UnboundedSender<ClientCommand>>>>;

/// Cloneable send side of a [`SocketClient`]
///
/// Handed to frame handlers and application threads. Sends never block:
/// they either queue the frame for the I/O task or fail straight away with
/// `SocketError::NotActive` when the handshake has not completed or the
/// client was stopped.
#[derive(Clone)]
pub struct SocketHandle {
    session: Arc<SessionState>,
    sequence: Arc<SequenceAllocator>,
    outbound: OutboundSlot,
}

impl SocketHandle {
    pub fn send(&self, frame: &Frame) -> Result<()> {
        if !self.session.is_connected() {
            return Err(SocketError::NotActive);
        }

        let outbound = self.outbound.lock();
        let tx = outbound.as_ref().ok_or(SocketError::NotActive)?;
        tx.send(ClientCommand::Send(frame.encode()))
            .map_err(|_| SocketError::NotActive)
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }
}

impl FrameSink for SocketHandle {
    fn send_frame(&self, frame: &Frame) -> Result<()> {
        self.send(frame)
    }

    fn next_request_id(&self) -> u64 {
        self.sequence.next()
    }
}

/// Handles of one start/stop cycle
struct Run {
    running: Arc<AtomicBool>,
    task: tokio::task::JoinHandle<()>,
    dispatcher: std::thread::JoinHandle<()>,
}

/// WebSocket client for the framed chat protocol
///
/// One client lives as long as the chat connection object that owns it and
/// can be started and stopped repeatedly. Its sequence allocator and session
/// state are shared by every run, so request ids keep increasing and the
/// last session key stays readable after a stop.
///
/// Each [`start`](Self::start) spawns:
/// - an async I/O task that connects, reads, writes and reconnects
/// - a dedicated dispatch thread that owns the [`FrameHandler`]
pub struct SocketClient {
    session: Arc<SessionState>,
    sequence: Arc<SequenceAllocator>,
    metrics: Arc<AtomicMetrics>,
    outbound: OutboundSlot,
    run: Mutex<Option<Run>>,
    event_tx: Sender<ClientEvent>,
    event_rx: Receiver<ClientEvent>,
}

impl SocketClient {
    pub fn new() -> Self {
        Self::with_sequence(SequenceAllocator::new())
    }

    pub fn with_sequence(sequence: SequenceAllocator) -> Self {
        let (event_tx, event_rx) = bounded(EVENT_QUEUE_CAPACITY);

        Self {
            session: Arc::new(SessionState::new()),
            sequence: Arc::new(sequence),
            metrics: Arc::new(AtomicMetrics::new()),
            outbound: Arc::new(Mutex::new(None)),
            run: Mutex::new(None),
            event_tx,
            event_rx,
        }
    }

    /// Open the transport and start delivering frames to `handler`
    ///
    /// Returns as soon as the I/O task is spawned; use
    /// [`SessionState::wait_active`] to wait for the handshake.
    ///
    /// # Errors
    /// - `SocketError::AlreadyActive` if a run is connecting or open
    /// - `SocketError::InvalidState` outside a Tokio runtime
    pub fn start<H: FrameHandler>(&self, config: SocketConfig, handler: H) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            SocketError::InvalidState("start must be called inside a Tokio runtime".into())
        })?;

        self.session.begin_connecting()?;

        let running = Arc::new(AtomicBool::new(true));
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = unbounded();

        let dispatcher = match spawn_dispatcher(
            handler,
            inbound_rx,
            Arc::clone(&running),
            config.dispatch_poll,
        ) {
            Ok(handle) => handle,
            Err(e) => {
                self.session.close();
                return Err(e.into());
            }
        };

        *self.outbound.lock() = Some(command_tx);

        info!(endpoint = config.endpoint(), "Starting chat transport");

        let task = runtime.spawn(run_client(
            config,
            Arc::clone(&self.session),
            Arc::clone(&self.metrics),
            Arc::clone(&running),
            command_rx,
            inbound_tx,
            self.event_tx.clone(),
        ));

        *self.run.lock() = Some(Run {
            running,
            task,
            dispatcher,
        });

        Ok(())
    }

    /// Close the transport; idempotent
    ///
    /// After this returns no further frame reaches the handler and every
    /// send fails with `NotActive`. The I/O task and dispatch thread wind
    /// down on their own; use [`shutdown`](Self::shutdown) to wait for them.
    pub fn stop(&self) {
        let previous = self.session.close();

        if let Some(tx) = self.outbound.lock().take() {
            let _ = tx.send(ClientCommand::Shutdown);
        }

        if let Some(run) = self.run.lock().as_ref() {
            run.running.store(false, Ordering::Release);
        }

        if previous != ConnectionState::Closed {
            info!(?previous, "Chat transport stopped");
        }
    }

    /// Stop and wait for the I/O task and dispatch thread to exit
    pub async fn shutdown(&self) {
        self.stop();

        let run = self.run.lock().take();
        if let Some(Run {
            task, dispatcher, ..
        }) = run
        {
            let _ = task.await;
            let _ = tokio::task::spawn_blocking(move || dispatcher.join()).await;
            debug!("Chat transport shut down");
        }
    }

    pub fn send(&self, frame: &Frame) -> Result<()> {
        self.handle().send(frame)
    }

    pub fn handle(&self) -> SocketHandle {
        SocketHandle {
            session: Arc::clone(&self.session),
            sequence: Arc::clone(&self.sequence),
            outbound: Arc::clone(&self.outbound),
        }
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    pub fn sequence(&self) -> &Arc<SequenceAllocator> {
        &self.sequence
    }

    #[inline]
    pub fn connection_state(&self) -> ConnectionState {
        self.session.state()
    }

    pub fn metrics(&self) -> Metrics {
        Metrics {
            frames_sent: self.metrics.frames_sent(),
            frames_received: self.metrics.frames_received(),
            reconnect_count: self.metrics.reconnect_count(),
            connection_state: self.session.state(),
        }
    }

    /// Try to receive a lifecycle event (non-blocking)
    pub fn try_recv_event(&self) -> Option<ClientEvent> {
        self.event_rx.try_recv().ok()
    }
}

impl Default for SocketClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSink for SocketClient {
    fn send_frame(&self, frame: &Frame) -> Result<()> {
        self.send(frame)
    }

    fn next_request_id(&self) -> u64 {
        self.sequence.next()
    }
}

impl Drop for SocketClient {
    fn drop(&mut self) {
        if self.session.state().is_running() {
            self.stop();
        }
    }
}

fn emit(event_tx: &Sender<ClientEvent>, event: ClientEvent) {
    let _ = event_tx.try_send(event);
}

/// Dispatch thread: owns the handler, delivers frames in arrival order
fn spawn_dispatcher<H: FrameHandler>(
    mut handler: H,
    inbound_rx: Receiver<Inbound>,
    running: Arc<AtomicBool>,
    poll: Duration,
) -> std::io::Result<std::thread::JoinHandle<()>> {
    std::thread::Builder::new()
        .name("chat-dispatch".to_string())
        .spawn(move || {
            let mut open = false;

            loop {
                match inbound_rx.recv_timeout(poll) {
                    Ok(Inbound::Opened) => open = true,
                    Ok(Inbound::Frame(raw)) => {
                        if !running.load(Ordering::Acquire) {
                            debug!("Shutdown detected, dropping queued frames");
                            break;
                        }
                        if let Err(e) = handler.handle(&raw) {
                            error!(error = %e, "Frame handler failed");
                        }
                    }
                    Ok(Inbound::Disconnected) => {
                        if open {
                            open = false;
                            notify_disconnect(&mut handler);
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        if !running.load(Ordering::Acquire) {
                            break;
                        }
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }

            if open {
                notify_disconnect(&mut handler);
            }
            debug!("Dispatch thread exiting");
        })
}

fn notify_disconnect<H: FrameHandler>(handler: &mut H) {
    if let Err(e) = handler.on_disconnect() {
        error!(error = %e, "Disconnect handler failed");
    }
}

/// Main I/O task: connect, run the message loop, reconnect per policy
async fn run_client(
    config: SocketConfig,
    session: Arc<SessionState>,
    metrics: Arc<AtomicMetrics>,
    running: Arc<AtomicBool>,
    mut command_rx: mpsc::UnboundedReceiver<ClientCommand>,
    inbound_tx: Sender<Inbound>,
    event_tx: Sender<ClientEvent>,
) {
    let mut reconnect_attempt = 0;

    loop {
        if !running.load(Ordering::Acquire) {
            debug!("Stop requested, exiting I/O loop");
            break;
        }

        if reconnect_attempt > 0 {
            emit(&event_tx, ClientEvent::Reconnecting(reconnect_attempt));
        }

        match connect_async(config.url()).await {
            Ok((ws_stream, _)) => {
                if !running.load(Ordering::Acquire) {
                    debug!("Stopped while connecting, dropping transport");
                    break;
                }

                info!(endpoint = config.endpoint(), "Chat transport connected");
                session.transport_opened();
                let _ = inbound_tx.send(Inbound::Opened);
                emit(&event_tx, ClientEvent::Connected);
                reconnect_attempt = 0;

                let result =
                    message_loop(ws_stream, &metrics, &running, &mut command_rx, &inbound_tx)
                        .await;

                let _ = inbound_tx.send(Inbound::Disconnected);
                emit(&event_tx, ClientEvent::Disconnected);

                match result {
                    Ok(()) => break,
                    Err(e) => {
                        warn!(error = %e, "Chat transport lost");
                        emit(&event_tx, ClientEvent::Error(e.to_string()));
                    }
                }
            }
            Err(e) => {
                error!(endpoint = config.endpoint(), error = %e, "Failed to connect chat transport");
                emit(&event_tx, ClientEvent::Error(e.to_string()));
            }
        }

        if !running.load(Ordering::Acquire) {
            break;
        }

        session.transport_lost();

        match config.reconnect.next_delay(reconnect_attempt) {
            Some(delay) => {
                info!(
                    "Reconnecting in {:?} (attempt {})",
                    delay,
                    reconnect_attempt + 1
                );
                if !interruptible_sleep(delay, &running).await {
                    break;
                }
                reconnect_attempt += 1;
                metrics.increment_reconnects();
            }
            None => {
                warn!("Reconnection policy exhausted, giving up");
                session.fail();
                break;
            }
        }
    }

    info!("Chat transport task exiting");
}

/// Sleep in short slices; returns `false` if stopped meanwhile
async fn interruptible_sleep(duration: Duration, running: &AtomicBool) -> bool {
    let check_interval = Duration::from_millis(100);
    let mut elapsed = Duration::ZERO;

    while elapsed < duration {
        if !running.load(Ordering::Acquire) {
            debug!("Stop requested during reconnection delay");
            return false;
        }
        let slice = check_interval.min(duration - elapsed);
        tokio::time::sleep(slice).await;
        elapsed += slice;
    }

    running.load(Ordering::Acquire)
}

/// Read/write loop for one open connection
///
/// `Ok(())` means a deliberate shutdown; errors mean the transport was lost.
async fn message_loop(
    ws_stream: WsStream,
    metrics: &AtomicMetrics,
    running: &AtomicBool,
    command_rx: &mut mpsc::UnboundedReceiver<ClientCommand>,
    inbound_tx: &Sender<Inbound>,
) -> Result<()> {
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        forward_inbound(text, metrics, running, inbound_tx)?;
                    }
                    Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                        Ok(text) => forward_inbound(text, metrics, running, inbound_tx)?,
                        Err(_) => debug!("Ignoring non UTF-8 binary frame"),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        return Err(SocketError::ConnectionClosed(format!(
                            "server sent close: {:?}",
                            frame
                        )));
                    }
                    // Ping/Pong control frames are answered by tungstenite
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        return Err(SocketError::WebSocket(e.to_string()));
                    }
                    None => {
                        return Err(SocketError::ConnectionClosed("stream ended".into()));
                    }
                }
            }

            cmd = command_rx.recv() => {
                match cmd {
                    Some(ClientCommand::Send(text)) => {
                        write
                            .send(Message::Text(text))
                            .await
                            .map_err(|e| SocketError::WebSocket(e.to_string()))?;
                        metrics.increment_sent();
                    }
                    Some(ClientCommand::Shutdown) | None => {
                        info!("Closing chat transport");
                        let _ = write.close().await;
                        return Ok(());
                    }
                }
            }
        }
    }
}

fn forward_inbound(
    text: String,
    metrics: &AtomicMetrics,
    running: &AtomicBool,
    inbound_tx: &Sender<Inbound>,
) -> Result<()> {
    metrics.increment_received();

    if !running.load(Ordering::Acquire) {
        debug!("Stop requested, dropping inbound frame");
        return Ok(());
    }

    inbound_tx
        .send(Inbound::Frame(text))
        .map_err(|e| SocketError::ChannelSend(e.to_string()))
}
