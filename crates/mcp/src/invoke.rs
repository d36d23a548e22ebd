//! One-shot remote tool invocation over a resolved transport target.
//!
//! Every call opens its own connection, performs the handshake, calls the
//! tool and closes the connection again, including when the call times out
//! or is cancelled.

use std::{sync::Arc, time::Duration};

use {
    serde_json::Value,
    tokio::time::Instant,
    tokio_util::sync::CancellationToken,
    tracing::{debug, warn},
};

use crate::{
    attach::{AttachOptions, attach},
    client::McpClient,
    error::{Error, Result},
    router::TransportTarget,
    streamable_http::{HttpOptions, StreamableHttpTransport},
    traits::McpTransport,
    types::{ClientInfo, ToolsCallResult},
};

/// Everything needed to open a client against either transport kind.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub client_info: ClientInfo,
    /// Upper bound for handshake plus tool call.
    pub call_timeout: Duration,
    pub http: HttpOptions,
    pub attach: AttachOptions,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            client_info: ClientInfo::default(),
            call_timeout: Duration::from_secs(60),
            http: HttpOptions::default(),
            attach: AttachOptions::default(),
        }
    }
}

async fn open_transport(
    target: &TransportTarget,
    options: &ConnectOptions,
) -> Result<Arc<dyn McpTransport>> {
    let transport: Arc<dyn McpTransport> = match target {
        TransportTarget::StreamableHttp(http) => StreamableHttpTransport::new(
            &http.url,
            http.auth_token.clone(),
            &options.http,
        )?,
        TransportTarget::Attach(attach_target) => attach(attach_target, &options.attach).await?,
    };
    Ok(transport)
}

fn server_label(target: &TransportTarget) -> String {
    match target {
        TransportTarget::StreamableHttp(http) => http.provider_id.clone(),
        TransportTarget::Attach(t) => format!("{}/{}", t.namespace, t.pod_name),
    }
}

/// Call `tool_name` on the provider behind `target`.
pub async fn invoke(
    target: &TransportTarget,
    tool_name: &str,
    arguments: Value,
    options: &ConnectOptions,
    cancel: &CancellationToken,
) -> Result<ToolsCallResult> {
    let deadline = Instant::now() + options.call_timeout;
    let transport = open_transport(target, options).await?;
    let mut client = McpClient::new(&server_label(target), transport);

    let outcome = {
        let exchange = async {
            client.initialize(&options.client_info).await?;
            client.call_tool(tool_name, arguments).await
        };
        tokio::select! {
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = tokio::time::timeout_at(deadline, exchange) => {
                result.unwrap_or(Err(Error::Timeout(options.call_timeout)))
            },
        }
    };

    if let Err(e) = &outcome {
        warn!(
            server = %client.server_name(),
            transport = target.kind(),
            tool = %tool_name,
            error = %e,
            "remote tool call failed"
        );
    }

    client.shutdown().await;
    debug!(server = %client.server_name(), tool = %tool_name, "MCP client closed");
    outcome
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use {super::*, serde_json::json, toolgate_common::types::AttachTarget};

    fn attach_with(command: &str, args: &[&str], call_timeout: Duration) -> ConnectOptions {
        ConnectOptions {
            call_timeout,
            attach: AttachOptions {
                command: command.into(),
                args: args.iter().map(|s| s.to_string()).collect(),
                ..AttachOptions::default()
            },
            ..ConnectOptions::default()
        }
    }

    fn attach_target() -> TransportTarget {
        TransportTarget::Attach(AttachTarget {
            namespace: "ns".into(),
            pod_name: "pod".into(),
            channel: "mcp-server".into(),
        })
    }

    #[tokio::test]
    async fn silent_provider_times_out() {
        // `sleep` never answers the handshake.
        let options = attach_with("sleep", &["30"], Duration::from_millis(200));
        let err = invoke(
            &attach_target(),
            "anything",
            json!({}),
            &options,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[tokio::test]
    async fn cancellation_aborts_the_call() {
        let options = attach_with("sleep", &["30"], Duration::from_secs(30));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let err = invoke(&attach_target(), "anything", json!({}), &options, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test]
    async fn unreachable_http_provider_fails() {
        let target = TransportTarget::StreamableHttp(crate::router::StreamableHttpTarget {
            provider_id: "p".into(),
            url: "http://127.0.0.1:1/mcp".into(),
            auth_token: None,
        });
        let result = invoke(
            &target,
            "anything",
            json!({}),
            &ConnectOptions::default(),
            &CancellationToken::new(),
        )
        .await;
        assert!(result.is_err());
    }
}
