//! # Transport
//!
//! The sole owner of one byte-stream connection.
//!
//! Every inbound line passes, in order, through the size gate, the rate gate,
//! JSON decoding and envelope validation before it is queued and handed to the
//! registered [`MessageHandler`]. Outbound messages are validated, size-checked
//! and written newline-terminated.
//!
//! ## Lifecycle
//! ```text
//! Idle --start()--> Open --close() / EOF / read error / stale health check--> Closed
//! ```
//! `Closed` is terminal; build a new transport to reconnect.
//!
//! ## Ordering
//! `handle_incoming_message` calls are serialized per transport: the handler
//! sees messages in the order their bytes arrived and never runs twice at once.
//!
//! ## Failure Reporting
//! Inbound chunks are refused with `NotConnected` unless the transport is open.
//! Size, rate and format rejections return to the caller of
//! `handle_incoming_message` and leave the transport open. Handler failures go
//! to [`MessageHandler::on_error`]. A failed health check is reported the same
//! way and closes the transport.

pub mod handler;
mod health;
pub mod queue;
mod stdio;

pub use handler::MessageHandler;
pub use queue::{MessageQueue, QueuedEntry};

use crate::config::TransportConfig;
use crate::core::codec::{Frame, LineCodec};
use crate::error::{constants, Result, TransportError};
use crate::protocol::message::{Message, MessageKind, RequestId};
use crate::protocol::validator::{decode, validate_shape};
use crate::utils::metrics::{Metrics, Timer};
use crate::utils::rate_limiter::TokenBucket;
use bytes::Bytes;
use futures::{FutureExt, SinkExt, StreamExt};
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info, instrument, trace, warn};

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Connection state of a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Constructed, not started
    Idle,
    /// Accepting and sending messages
    Open,
    /// Terminal
    Closed,
}

struct ConnectionState {
    status: ConnectionStatus,
    last_health_check: Instant,
    health_task: Option<JoinHandle<()>>,
}

struct Inner {
    config: TransportConfig,
    state: Mutex<ConnectionState>,
    limiter: Mutex<TokenBucket>,
    queue: Mutex<MessageQueue>,
    handler: Option<Arc<dyn MessageHandler>>,
    writer: AsyncMutex<FramedWrite<BoxedWriter, LineCodec>>,
    /// Held for the whole of one inbound message to keep dispatch ordered
    inbound: AsyncMutex<()>,
    closed_tx: watch::Sender<bool>,
    metrics: Metrics,
}

/// Std mutex guards are never held across an await; a poisoned lock still
/// holds consistent data for every type stored here.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Inner {
    fn is_open(&self) -> bool {
        lock(&self.state).status == ConnectionStatus::Open
    }

    fn check_inbound_size(&self, size: usize) -> Result<()> {
        let max = self.config.max_message_size;
        if size > max {
            self.metrics.oversized();
            warn!(size, max, "{}", constants::ERR_MESSAGE_TOO_LARGE);
            return Err(TransportError::MessageTooLarge { size, max });
        }
        Ok(())
    }

    fn report(&self, error: &TransportError) {
        if let Some(handler) = &self.handler {
            handler.on_error(error);
        }
    }

    async fn dispatch(&self, message: Message) {
        let Some(handler) = self.handler.clone() else {
            return;
        };
        // Closed by the health task while this message was in flight.
        if !self.is_open() {
            debug!(id = ?message.id, "Transport closed, message not dispatched");
            return;
        }

        let _timer = Timer::start("dispatch");
        let request_id = match message.kind() {
            MessageKind::Request => message.id.clone(),
            _ => None,
        };
        // The handler is called inside the guarded future so a panic raised
        // before it returns its own future is caught too.
        let outcome = AssertUnwindSafe(async { handler.on_message(message).await })
            .catch_unwind()
            .await;

        let failure = match outcome {
            Ok(Ok(Some(reply))) => {
                if let Err(e) = self.send(&reply).await {
                    warn!(error = %e, id = ?reply.id, "Failed to send reply");
                    handler.on_error(&e);
                }
                return;
            }
            Ok(Ok(None)) => return,
            Ok(Err(e)) => {
                warn!(error = %e, "Message handler failed");
                e
            }
            Err(_) => {
                error!("{}", constants::ERR_HANDLER_PANICKED);
                TransportError::Handler(constants::ERR_HANDLER_PANICKED.to_string())
            }
        };
        self.metrics.handler_error();
        handler.on_error(&failure);

        if let Some(id) = request_id {
            let reply = Message::error_response(Some(id), failure.to_error_object());
            if let Err(e) = self.send(&reply).await {
                debug!(error = %e, id = ?reply.id, "Could not report handler failure to peer");
            }
        }
    }

    async fn send(&self, message: &Message) -> Result<()> {
        if !self.is_open() {
            return Err(TransportError::NotConnected);
        }
        validate_shape(message)?;

        let json = serde_json::to_string(message)?;
        let max = self.config.max_message_size;
        if json.len() > max {
            warn!(size = json.len(), max, "Outbound message too large");
            return Err(TransportError::MessageTooLarge {
                size: json.len(),
                max,
            });
        }

        let size = json.len() as u64;
        self.writer.lock().await.send(Bytes::from(json)).await?;
        self.metrics.message_sent(size);
        trace!(size, id = ?message.id, "Message sent");
        Ok(())
    }

    fn check_health(&self, now: Instant) -> Result<()> {
        let mut state = lock(&self.state);
        if state.status != ConnectionStatus::Open {
            return Ok(());
        }
        let elapsed = now.saturating_duration_since(state.last_health_check);
        if elapsed > self.config.connection_timeout {
            return Err(TransportError::HealthCheckFailed {
                elapsed_ms: elapsed.as_millis() as u64,
                timeout_ms: self.config.connection_timeout.as_millis() as u64,
            });
        }
        state.last_health_check = now;
        Ok(())
    }

    async fn run_health_check(&self) -> Result<()> {
        if let Err(err) = self.check_health(Instant::now()) {
            error!(error = %err, "Health check failed, closing transport");
            self.metrics.health_check_failed();
            self.report(&err);
            self.close().await;
            return Err(err);
        }
        trace!("Health check passed");
        Ok(())
    }

    async fn close(&self) {
        let health_task = {
            let mut state = lock(&self.state);
            if state.status == ConnectionStatus::Closed {
                return;
            }
            state.status = ConnectionStatus::Closed;
            state.health_task.take()
        };

        let dropped = {
            let mut queue = lock(&self.queue);
            let dropped = queue.len();
            queue.clear();
            dropped
        };
        self.closed_tx.send_replace(true);
        info!(dropped, "Transport closed");

        if let Some(handler) = &self.handler {
            handler.on_close();
        }

        let mut writer = self.writer.lock().await;
        if let Err(e) = SinkExt::<Bytes>::flush(&mut *writer).await {
            debug!(error = %e, "Failed to flush output on close");
        }
        drop(writer);
        self.metrics.log_metrics();

        // Last: this may be the health-check task closing itself.
        if let Some(task) = health_task {
            task.abort();
        }
    }
}

/// Cheap, cloneable handle to one connection
#[derive(Clone)]
pub struct Transport {
    inner: Arc<Inner>,
}

impl Transport {
    /// A transport writing to `writer`, with no inbound handler.
    pub fn new<W>(config: TransportConfig, writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::build(config, Box::new(writer), None)
    }

    /// A transport writing to `writer` and delivering inbound messages to `handler`.
    pub fn with_handler<W>(config: TransportConfig, writer: W, handler: Arc<dyn MessageHandler>) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::build(config, Box::new(writer), Some(handler))
    }

    fn build(
        config: TransportConfig,
        writer: BoxedWriter,
        handler: Option<Arc<dyn MessageHandler>>,
    ) -> Self {
        let limiter = TokenBucket::with_policy(
            config.rate_limit.capacity,
            config.rate_limit.window,
            config.rate_limit.policy,
        );
        let queue = MessageQueue::new(config.connection_timeout);
        let writer = FramedWrite::new(writer, LineCodec::new(config.max_message_size));
        let (closed_tx, _) = watch::channel(false);

        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(ConnectionState {
                    status: ConnectionStatus::Idle,
                    last_health_check: Instant::now(),
                    health_task: None,
                }),
                limiter: Mutex::new(limiter),
                queue: Mutex::new(queue),
                handler,
                writer: AsyncMutex::new(writer),
                inbound: AsyncMutex::new(()),
                closed_tx,
                metrics: Metrics::new(),
                config,
            }),
        }
    }

    /// Open the transport and start the periodic health check.
    ///
    /// Starting an open transport is a no-op; starting a closed one fails with
    /// `ConnectionClosed`.
    pub async fn start(&self) -> Result<()> {
        let mut state = lock(&self.inner.state);
        match state.status {
            ConnectionStatus::Open => {
                debug!("Transport already started");
                return Ok(());
            }
            ConnectionStatus::Closed => return Err(TransportError::ConnectionClosed),
            ConnectionStatus::Idle => {}
        }

        state.status = ConnectionStatus::Open;
        state.last_health_check = Instant::now();
        state.health_task = Some(tokio::spawn(health::run(
            Arc::downgrade(&self.inner),
            self.inner.config.health_check_interval,
        )));

        info!(
            max_message_size = self.inner.config.max_message_size,
            rate_limit = self.inner.config.rate_limit.capacity,
            window_ms = self.inner.config.rate_limit.window.as_millis() as u64,
            "Transport started"
        );
        Ok(())
    }

    /// Process one inbound chunk: connection check, size gate, rate gate,
    /// decode, validate, enqueue, dispatch, sweep.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn handle_incoming_message(&self, bytes: &[u8]) -> Result<()> {
        let _inbound = self.inner.inbound.lock().await;

        if !self.inner.is_open() {
            debug!("Transport not open, inbound message refused");
            return Err(TransportError::NotConnected);
        }

        self.inner.check_inbound_size(bytes.len())?;

        let admitted = lock(&self.inner.limiter).try_acquire();
        if !admitted {
            self.inner.metrics.rate_limited();
            warn!("{}", constants::ERR_RATE_LIMIT_EXCEEDED);
            return Err(TransportError::RateLimitExceeded);
        }

        let message = decode(bytes).inspect_err(|e| {
            self.inner.metrics.invalid();
            warn!(error = %e, "Rejected invalid message");
        })?;

        lock(&self.inner.queue).push(message.clone(), Instant::now());
        self.inner.metrics.message_received(bytes.len() as u64);
        debug!(kind = ?message.kind(), method = ?message.method, id = ?message.id, "Message accepted");

        self.inner.dispatch(message).await;

        let expired = lock(&self.inner.queue).sweep(Instant::now());
        if expired > 0 {
            self.inner.metrics.expired(expired as u64);
        }
        Ok(())
    }

    /// Validate, size-check and write one message followed by a newline.
    pub async fn send(&self, message: &Message) -> Result<()> {
        self.inner.send(message).await
    }

    /// Close the transport. Idempotent.
    pub async fn close(&self) {
        self.inner.close().await;
    }

    /// Run one health check now; a stale connection is reported and closed.
    pub async fn run_health_check(&self) -> Result<()> {
        self.inner.run_health_check().await
    }

    /// Read newline-delimited messages from `reader` until end of input, a
    /// read error, or the transport closing.
    ///
    /// Rejected lines are answered with a JSON-RPC error response when the
    /// peer can use one; see [`rejection_reply`].
    pub async fn serve<R>(&self, reader: R) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }

        let mut frames = FramedRead::new(reader, LineCodec::new(self.inner.config.max_message_size));
        let mut closed = self.inner.closed_tx.subscribe();

        loop {
            if !self.is_connected() {
                break;
            }

            tokio::select! {
                biased;
                changed = closed.changed() => {
                    if changed.is_err() || *closed.borrow() {
                        debug!("Transport closed, stopping reader");
                        break;
                    }
                }
                frame = frames.next() => match frame {
                    Some(Ok(Frame::Line(line))) => {
                        if let Err(err) = self.handle_incoming_message(&line).await {
                            self.reply_to_rejection(&err, Some(&line[..])).await;
                        }
                    }
                    Some(Ok(Frame::Oversized(size))) => {
                        if let Err(err) = self.inner.check_inbound_size(size) {
                            self.reply_to_rejection(&err, None).await;
                        }
                    }
                    Some(Err(err)) => {
                        error!(error = %err, "Failed to read from input stream");
                        self.inner.report(&err);
                        self.close().await;
                        return Err(err);
                    }
                    None => {
                        info!("Input stream ended");
                        self.close().await;
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    async fn reply_to_rejection(&self, err: &TransportError, line: Option<&[u8]>) {
        if let Some(reply) = rejection_reply(err, line) {
            if let Err(send_err) = self.send(&reply).await {
                debug!(error = %send_err, "Could not report rejection to peer");
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.inner.is_open()
    }

    pub fn status(&self) -> ConnectionStatus {
        lock(&self.inner.state).status
    }

    pub fn last_health_check(&self) -> Instant {
        lock(&self.inner.state).last_health_check
    }

    /// Messages currently retained in the queue
    pub fn pending_messages(&self) -> usize {
        lock(&self.inner.queue).len()
    }

    /// Tokens left in the rate limiter as of its last admission check
    pub fn available_tokens(&self) -> f64 {
        lock(&self.inner.limiter).tokens()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.inner.metrics
    }

    pub fn config(&self) -> &TransportConfig {
        &self.inner.config
    }
}

/// The error response owed to the peer for a rejected inbound line, if any.
///
/// Lines that are not JSON objects are answered without an id. Objects carrying
/// `result` or `error` but no `method` are responses from the peer and are never
/// answered, and rate-limited notifications are dropped silently.
pub fn rejection_reply(err: &TransportError, line: Option<&[u8]>) -> Option<Message> {
    let value = line.and_then(|l| serde_json::from_slice::<Value>(l).ok());
    let Some(Value::Object(obj)) = value else {
        return Some(Message::error_response(None, err.to_error_object()));
    };

    let has_method = obj.contains_key("method");
    if !has_method && (obj.contains_key("result") || obj.contains_key("error")) {
        return None;
    }
    let id = match obj.get("id") {
        Some(Value::Number(n)) => Some(RequestId::Number(n.clone())),
        Some(Value::String(s)) => Some(RequestId::String(s.clone())),
        _ => None,
    };
    if id.is_none() && has_method && matches!(err, TransportError::RateLimitExceeded) {
        return None;
    }
    Some(Message::error_response(id, err.to_error_object()))
}
