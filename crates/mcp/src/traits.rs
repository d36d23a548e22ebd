//! Transport abstraction shared by the stdio (attach) and streamable HTTP transports.

use {async_trait::async_trait, serde_json::Value};

use crate::{error::Result, types::JsonRpcResponse};

/// Transport layer for MCP communication (JSON-RPC).
///
/// `StdioTransport` implements this over stdin/stdout of an attached process,
/// `StreamableHttpTransport` over HTTP POST.
#[async_trait]
pub trait McpTransport: Send + Sync {
    /// Send a JSON-RPC request and wait for the response.
    async fn request(&self, method: &str, params: Option<Value>) -> Result<JsonRpcResponse>;

    /// Send a JSON-RPC notification (no response expected).
    async fn notify(&self, method: &str, params: Option<Value>) -> Result<()>;

    /// Close the connection and release the remote session or process.
    async fn close(&self);
}
