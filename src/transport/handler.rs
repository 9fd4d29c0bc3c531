use crate::error::{Result, TransportError};
use crate::protocol::message::Message;
use futures::future::BoxFuture;
use tracing::warn;

/// Receiver of everything a [`Transport`](super::Transport) delivers.
///
/// A transport holds at most one handler, injected at construction. Calls are
/// made in arrival order and never overlap for a single transport.
pub trait MessageHandler: Send + Sync + 'static {
    /// Handle one validated inbound message.
    ///
    /// A returned message is sent back over the transport as the reply. Errors
    /// (and panics) are routed to [`on_error`](Self::on_error) and never reach
    /// the stream reader.
    fn on_message(&self, message: Message) -> BoxFuture<'_, Result<Option<Message>>>;

    /// Called for handler failures, reply send failures, stream read failures
    /// and health-check failures.
    fn on_error(&self, error: &TransportError) {
        warn!(error = %error, "Transport error");
    }

    /// Called exactly once when the transport closes.
    fn on_close(&self) {}
}
