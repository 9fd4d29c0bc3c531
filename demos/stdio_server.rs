//! A small JSON-RPC server over stdin/stdout.
//!
//! ```text
//! echo '{"jsonrpc":"2.0","id":1,"method":"ping"}' | cargo run --example stdio_server
//! ```
//!
//! Settings come from `RPC_RELAY_*` environment variables, or from a TOML file
//! given as the first argument. Logs go to stderr.

use rpc_relay::protocol::ErrorObject;
use rpc_relay::{init_logging, Dispatcher, Message, RelayConfig, Transport};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> rpc_relay::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => RelayConfig::from_file(path)?,
        None => RelayConfig::from_env()?,
    };
    config.validate_strict()?;
    init_logging(&config.logging)?;

    let dispatcher = Dispatcher::new();
    dispatcher.register("ping", |_msg: Message| async { Ok(json!("pong")) })?;
    dispatcher.register("echo", |msg: Message| async move {
        Ok(Value::Object(msg.params.unwrap_or_default()))
    })?;
    dispatcher.register("sum", |msg: Message| async move {
        let Some(values) = msg
            .params
            .as_ref()
            .and_then(|p| p.get("values"))
            .and_then(Value::as_array)
        else {
            return Err(ErrorObject::invalid_params("expected params.values to be an array"));
        };
        let total: f64 = values.iter().filter_map(Value::as_f64).sum();
        Ok(json!(total))
    })?;
    dispatcher.register("log", |msg: Message| async move {
        info!(params = ?msg.params, "Notification received");
        Ok(Value::Null)
    })?;

    let transport = Transport::stdio_with_handler(config.transport, Arc::new(dispatcher));
    transport.start().await?;

    let serve = transport.serve_stdio();
    tokio::pin!(serve);
    tokio::select! {
        result = &mut serve => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            transport.close().await;
        }
    }

    let stats = transport.metrics().snapshot();
    info!(received = stats.messages_received, sent = stats.messages_sent, "Server stopped");
    Ok(())
}
