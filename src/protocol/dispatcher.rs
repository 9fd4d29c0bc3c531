use crate::error::{Result, TransportError};
use crate::protocol::message::{ErrorObject, Message, MessageKind};
use crate::transport::MessageHandler;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Outcome of a method handler: the `result` payload or a JSON-RPC error object.
pub type MethodResult = std::result::Result<Value, ErrorObject>;

type HandlerFn = dyn Fn(Message) -> BoxFuture<'static, MethodResult> + Send + Sync + 'static;

/// Routes inbound requests to async handlers by method name.
///
/// Requests get a response or an error response, notifications run their
/// handler without a reply, and inbound responses are ignored.
pub struct Dispatcher {
    handlers: RwLock<HashMap<Cow<'static, str>, Arc<HandlerFn>>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Register `handler` for `method`, replacing any previous registration.
    pub fn register<F, Fut>(&self, method: &str, handler: F) -> Result<()>
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = MethodResult> + Send + 'static,
    {
        let mut handlers = self.handlers.write().map_err(|_| {
            TransportError::Handler("Failed to acquire write lock on dispatcher".to_string())
        })?;

        let boxed: Arc<HandlerFn> = Arc::new(move |msg: Message| handler(msg).boxed());
        handlers.insert(Cow::Owned(method.to_string()), boxed);
        Ok(())
    }

    /// Names of all registered methods, sorted
    pub fn methods(&self) -> Vec<String> {
        let mut names: Vec<String> = match self.handlers.read() {
            Ok(handlers) => handlers.keys().map(|k| k.to_string()).collect(),
            Err(_) => Vec::new(),
        };
        names.sort();
        names
    }

    fn lookup(&self, method: &str) -> Result<Option<Arc<HandlerFn>>> {
        let handlers = self.handlers.read().map_err(|_| {
            TransportError::Handler("Failed to acquire read lock on dispatcher".to_string())
        })?;
        Ok(handlers.get(method).cloned())
    }

    /// Dispatch one message and produce the reply, if any.
    pub async fn dispatch(&self, msg: Message) -> Result<Option<Message>> {
        let kind = msg.kind();
        let method = match (&kind, msg.method.as_deref()) {
            (MessageKind::Request | MessageKind::Notification, Some(method)) => method.to_string(),
            _ => {
                debug!(kind = ?kind, id = ?msg.id, "Ignoring inbound response");
                return Ok(None);
            }
        };

        let handler = self.lookup(&method)?;
        let id = msg.id.clone();

        match (kind, handler) {
            (MessageKind::Request, Some(handler)) => {
                let reply = match handler(msg).await {
                    Ok(result) => id.map(|id| Message::response(id, result)),
                    Err(error) => Some(Message::error_response(id, error)),
                };
                Ok(reply)
            }
            (MessageKind::Request, None) => {
                warn!(method = %method, "Method not found");
                Ok(Some(Message::error_response(
                    id,
                    ErrorObject::method_not_found(&method),
                )))
            }
            (_, Some(handler)) => {
                if let Err(error) = handler(msg).await {
                    warn!(method = %method, code = %error.code, "Notification handler failed");
                }
                Ok(None)
            }
            (_, None) => {
                debug!(method = %method, "No handler for notification");
                Ok(None)
            }
        }
    }
}

impl MessageHandler for Dispatcher {
    fn on_message(&self, message: Message) -> BoxFuture<'_, Result<Option<Message>>> {
        self.dispatch(message).boxed()
    }
}
