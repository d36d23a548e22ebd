//! Streamable HTTP transport for MCP servers.
//!
//! JSON-RPC requests go out as HTTP POSTs; the server answers either with a
//! JSON body or a short event stream carrying the response. The session id
//! handed out by the server is replayed on every request and released with a
//! `DELETE` on close.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use {
    reqwest::Client,
    secrecy::{ExposeSecret, Secret},
    tokio::sync::RwLock,
    tracing::{debug, warn},
};

use crate::{
    error::{Context, Error, McpTransportError, Result},
    traits::McpTransport,
    types::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION},
};

const MCP_PROTOCOL_VERSION_HEADER: &str = "MCP-Protocol-Version";
const MCP_SESSION_ID_HEADER: &str = "Mcp-Session-Id";
const STREAMABLE_ACCEPT_HEADER: &str = "application/json, text/event-stream";

/// Timeouts for HTTP providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpOptions {
    pub request_timeout: Duration,
    pub close_timeout: Duration,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(60),
            close_timeout: Duration::from_secs(5),
        }
    }
}

/// HTTP-based transport for an MCP server exposing a streamable HTTP endpoint.
pub struct StreamableHttpTransport {
    client: Client,
    url: String,
    next_id: AtomicU64,
    bearer_token: Option<Secret<String>>,
    close_timeout: Duration,
    /// Session identifier assigned by the server.
    session_id: RwLock<Option<String>>,
}

impl StreamableHttpTransport {
    pub fn new(
        url: &str,
        bearer_token: Option<Secret<String>>,
        options: &HttpOptions,
    ) -> Result<Arc<Self>> {
        let client = Client::builder()
            .timeout(options.request_timeout)
            .build()
            .context("failed to build HTTP client for streamable HTTP transport")?;

        Ok(Arc::new(Self {
            client,
            url: url.to_string(),
            next_id: AtomicU64::new(1),
            bearer_token,
            close_timeout: options.close_timeout,
            session_id: RwLock::new(None),
        }))
    }

    async fn with_headers(&self, mut req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req = req.header(MCP_PROTOCOL_VERSION_HEADER, PROTOCOL_VERSION);
        if let Some(session_id) = self.session_id.read().await.clone() {
            req = req.header(MCP_SESSION_ID_HEADER, session_id);
        }
        if let Some(token) = &self.bearer_token {
            req = req.header("Authorization", format!("Bearer {}", token.expose_secret()));
        }
        req
    }

    async fn post(&self, method: &str, body: &impl serde::Serialize) -> Result<reqwest::Response> {
        let req = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header("Accept", STREAMABLE_ACCEPT_HEADER);
        let resp = self
            .with_headers(req)
            .await
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST to '{}' for '{method}' failed", self.url))?;

        self.store_session_id_from_response(&resp).await;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(McpTransportError::Unauthorized {
                www_authenticate: resp
                    .headers()
                    .get("www-authenticate")
                    .and_then(|v| v.to_str().ok())
                    .map(String::from),
            }
            .into());
        }
        Ok(resp)
    }

    async fn store_session_id_from_response(&self, response: &reqwest::Response) {
        let Some(raw) = response.headers().get(MCP_SESSION_ID_HEADER) else {
            return;
        };
        let Ok(session_id) = raw.to_str() else {
            return;
        };
        if session_id.trim().is_empty() {
            return;
        }

        let mut slot = self.session_id.write().await;
        if slot.as_deref() != Some(session_id) {
            debug!(url = %self.url, session_id = %session_id, "updated MCP session id");
            *slot = Some(session_id.to_string());
        }
    }

    fn response_is_event_stream(resp: &reqwest::Response) -> bool {
        resp.headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|ct| ct.split(';').next())
            .is_some_and(|base| base.trim() == "text/event-stream")
    }

    /// Pick the first `data:` payload that parses as a JSON-RPC response.
    fn parse_event_stream_response(body: &str, method: &str) -> Result<JsonRpcResponse> {
        let mut data = String::new();

        for line in body.lines() {
            let trimmed = line.trim_end();
            if let Some(rest) = trimmed.strip_prefix("data:") {
                if !data.is_empty() {
                    data.push('\n');
                }
                data.push_str(rest.trim_start());
                continue;
            }

            if trimmed.is_empty() && !data.is_empty() {
                if let Ok(resp) = serde_json::from_str::<JsonRpcResponse>(&data) {
                    return Ok(resp);
                }
                data.clear();
            }
        }

        if !data.is_empty()
            && let Ok(resp) = serde_json::from_str::<JsonRpcResponse>(&data)
        {
            return Ok(resp);
        }

        Err(Error::message(format!(
            "failed to parse JSON-RPC response from event stream for '{method}'"
        )))
    }
}

#[async_trait::async_trait]
impl McpTransport for StreamableHttpTransport {
    async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<JsonRpcResponse> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let req = JsonRpcRequest::new(id, method, params);

        debug!(method = %method, id = %id, url = %self.url, "HTTP client -> MCP server");

        let http_resp = self.post(method, &req).await?;

        if !http_resp.status().is_success() {
            let status = http_resp.status().as_u16();
            let body = http_resp.text().await.unwrap_or_default();
            return Err(McpTransportError::Http {
                method: method.to_string(),
                status,
                body,
            }
            .into());
        }

        let resp: JsonRpcResponse = if Self::response_is_event_stream(&http_resp) {
            let body = http_resp
                .text()
                .await
                .with_context(|| format!("failed to read event stream response for '{method}'"))?;
            Self::parse_event_stream_response(&body, method)?
        } else {
            http_resp
                .json()
                .await
                .with_context(|| format!("failed to parse JSON-RPC response for '{method}'"))?
        };

        if let Some(ref err) = resp.error {
            return Err(McpTransportError::Rpc {
                method: method.to_string(),
                code: err.code,
                message: err.message.clone(),
            }
            .into());
        }

        Ok(resp)
    }

    async fn notify(&self, method: &str, params: Option<serde_json::Value>) -> Result<()> {
        debug!(method = %method, url = %self.url, "HTTP client -> MCP server (notification)");

        let http_resp = self
            .post(method, &JsonRpcNotification::new(method, params))
            .await?;

        if !http_resp.status().is_success() {
            let status = http_resp.status();
            warn!(method = %method, %status, "MCP notification returned non-success");
        }

        Ok(())
    }

    async fn close(&self) {
        if self.session_id.read().await.is_none() {
            return;
        }

        let req = self.client.delete(&self.url).timeout(self.close_timeout);
        let req = self.with_headers(req).await;
        self.session_id.write().await.take();

        if let Err(e) = req.send().await {
            warn!(url = %self.url, error = %e, "failed to close MCP streamable HTTP session");
        }
    }
}
