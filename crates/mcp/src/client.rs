//! MCP client: protocol handshake and tool calls against a single provider.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    error::{Context, Error, Result},
    traits::McpTransport,
    types::{
        ClientCapabilities, ClientInfo, InitializeParams, InitializeResult, PROTOCOL_VERSION,
        ToolsCallParams, ToolsCallResult,
    },
};

/// State of an MCP client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McpClientState {
    /// Transport open, not yet initialized.
    Connected,
    /// `initialize` completed, `initialized` notification sent.
    Ready,
    /// Transport closed.
    Closed,
}

/// A short-lived MCP client over any transport.
pub struct McpClient {
    server_name: String,
    transport: Arc<dyn McpTransport>,
    state: McpClientState,
}

impl McpClient {
    pub fn new(server_name: &str, transport: Arc<dyn McpTransport>) -> Self {
        Self {
            server_name: server_name.into(),
            transport,
            state: McpClientState::Connected,
        }
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn state(&self) -> McpClientState {
        self.state
    }

    /// Perform the handshake (`initialize` + `notifications/initialized`).
    pub async fn initialize(&mut self, client_info: &ClientInfo) -> Result<()> {
        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION.into(),
            capabilities: ClientCapabilities::default(),
            client_info: client_info.clone(),
        };

        let resp = match self
            .transport
            .request("initialize", Some(serde_json::to_value(&params)?))
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!(server = %self.server_name, error = %e, "MCP initialize handshake failed");
                return Err(e);
            },
        };

        let result: InitializeResult =
            serde_json::from_value(resp.result.context("MCP initialize returned no result")?)
                .context("failed to parse MCP initialize result")?;

        info!(
            server = %self.server_name,
            protocol = %result.protocol_version,
            server_name = %result.server_info.name,
            "MCP server initialized"
        );

        self.transport
            .notify("notifications/initialized", None)
            .await?;
        self.state = McpClientState::Ready;

        Ok(())
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.state != McpClientState::Ready {
            return Err(Error::message(format!(
                "MCP client for '{}' is not ready (state: {:?})",
                self.server_name, self.state
            )));
        }
        Ok(())
    }

    /// Call a tool by its bare (unprefixed) name.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolsCallResult> {
        self.ensure_ready()?;

        let params = ToolsCallParams {
            name: name.into(),
            arguments,
        };

        let resp = self
            .transport
            .request("tools/call", Some(serde_json::to_value(&params)?))
            .await?;

        let result: ToolsCallResult =
            serde_json::from_value(resp.result.context("tools/call returned no result")?)?;

        debug!(
            server = %self.server_name,
            tool = %name,
            items = result.content.len(),
            is_error = result.is_error,
            "MCP tool call returned"
        );

        Ok(result)
    }

    /// Close the transport. Safe to call more than once.
    pub async fn shutdown(&mut self) {
        if self.state == McpClientState::Closed {
            return;
        }
        self.state = McpClientState::Closed;
        self.transport.close().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use {
        super::*,
        crate::types::JsonRpcResponse,
        async_trait::async_trait,
        serde_json::{Value, json},
        std::sync::Mutex,
    };

    /// Answers every request from a fixed table keyed by method.
    #[derive(Default)]
    struct ScriptedTransport {
        calls: Mutex<Vec<String>>,
        closed: Mutex<u32>,
    }

    #[async_trait]
    impl McpTransport for ScriptedTransport {
        async fn request(&self, method: &str, params: Option<Value>) -> Result<JsonRpcResponse> {
            self.calls.lock().unwrap().push(method.to_string());
            let result = match method {
                "initialize" => json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {"tools": {}},
                    "serverInfo": {"name": "scripted"}
                }),
                "tools/call" => json!({
                    "content": [{"type": "text", "text": params.unwrap_or_default()["name"]}],
                }),
                _ => return Err(Error::message("unexpected method")),
            };
            Ok(JsonRpcResponse {
                jsonrpc: "2.0".into(),
                id: json!(1),
                result: Some(result),
                error: None,
            })
        }

        async fn notify(&self, method: &str, _params: Option<Value>) -> Result<()> {
            self.calls.lock().unwrap().push(method.to_string());
            Ok(())
        }

        async fn close(&self) {
            *self.closed.lock().unwrap() += 1;
        }
    }

    #[test]
    fn test_client_state_debug() {
        assert_eq!(format!("{:?}", McpClientState::Connected), "Connected");
        assert_eq!(format!("{:?}", McpClientState::Ready), "Ready");
        assert_eq!(format!("{:?}", McpClientState::Closed), "Closed");
    }

    #[tokio::test]
    async fn handshake_then_call() {
        let transport = Arc::new(ScriptedTransport::default());
        let mut client = McpClient::new("scripted", transport.clone());

        assert!(client.call_tool("echo", json!({})).await.is_err());

        client.initialize(&ClientInfo::default()).await.unwrap();
        assert_eq!(client.state(), McpClientState::Ready);

        let result = client.call_tool("echo", json!({"x": 1})).await.unwrap();
        assert_eq!(result.content[0]["text"], "echo");
        assert!(!result.is_error);

        assert_eq!(*transport.calls.lock().unwrap(), vec![
            "initialize",
            "notifications/initialized",
            "tools/call"
        ]);
    }

    #[tokio::test]
    async fn shutdown_closes_once() {
        let transport = Arc::new(ScriptedTransport::default());
        let mut client = McpClient::new("scripted", transport.clone());
        client.shutdown().await;
        client.shutdown().await;
        assert_eq!(*transport.closed.lock().unwrap(), 1);
        assert_eq!(client.state(), McpClientState::Closed);
    }
}
