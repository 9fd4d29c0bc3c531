//! Process stdin/stdout as the byte stream.

use super::{MessageHandler, Transport};
use crate::config::TransportConfig;
use crate::error::Result;
use std::sync::Arc;

impl Transport {
    /// A transport that writes to the process's stdout.
    pub fn stdio(config: TransportConfig) -> Self {
        Self::new(config, tokio::io::stdout())
    }

    pub fn stdio_with_handler(config: TransportConfig, handler: Arc<dyn MessageHandler>) -> Self {
        Self::with_handler(config, tokio::io::stdout(), handler)
    }

    /// Serve messages read from the process's stdin.
    ///
    /// Returns when stdin reaches end of input or the transport closes.
    pub async fn serve_stdio(&self) -> Result<()> {
        self.serve(tokio::io::stdin()).await
    }
}
