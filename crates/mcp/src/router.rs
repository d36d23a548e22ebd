//! Decides how a provider is reached: streamable HTTP endpoint or attach channel.

use {
    secrecy::Secret,
    toolgate_common::{SharedProviderRuntime, types::AttachTarget},
    tracing::debug,
};

use crate::error::{Error, Result};

/// A provider reachable over streamable HTTP.
#[derive(Debug, Clone)]
pub struct StreamableHttpTarget {
    pub provider_id: String,
    pub url: String,
    pub auth_token: Option<Secret<String>>,
}

/// Where and how to open a connection to a provider.
#[derive(Debug, Clone)]
pub enum TransportTarget {
    StreamableHttp(StreamableHttpTarget),
    Attach(AttachTarget),
}

impl TransportTarget {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StreamableHttp(_) => "http",
            Self::Attach(_) => "attach",
        }
    }
}

/// Resolves provider ids to transport targets using live runtime state.
#[derive(Clone)]
pub struct TransportRouter {
    runtime: SharedProviderRuntime,
}

impl TransportRouter {
    pub fn new(runtime: SharedProviderRuntime) -> Self {
        Self { runtime }
    }

    /// Resolve the transport for `provider_id`.
    ///
    /// Fails with [`Error::NoHttpEndpoint`] when the provider speaks HTTP but
    /// has no registered endpoint.
    pub async fn resolve_transport(&self, provider_id: &str) -> Result<TransportTarget> {
        if self.runtime.uses_streamable_http(provider_id).await? {
            let url = self
                .runtime
                .http_endpoint_url(provider_id)
                .await?
                .ok_or_else(|| Error::NoHttpEndpoint {
                    provider_id: provider_id.to_string(),
                })?;
            let auth_token = self.runtime.http_auth_token(provider_id).await?;
            debug!(provider_id, url = %url, "resolved streamable HTTP transport");
            return Ok(TransportTarget::StreamableHttp(StreamableHttpTarget {
                provider_id: provider_id.to_string(),
                url,
                auth_token,
            }));
        }

        let target = self.runtime.attach_target(provider_id).await?;
        debug!(
            provider_id,
            namespace = %target.namespace,
            pod = %target.pod_name,
            "resolved attach transport"
        );
        Ok(TransportTarget::Attach(target))
    }
}
