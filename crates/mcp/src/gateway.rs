//! Tool gateway: routes an agent's tool call to its provider and returns a
//! well-formed result whatever happens along the way.

use std::time::Instant;

use {
    futures::future::join_all,
    serde_json::Value,
    tokio_util::sync::CancellationToken,
    toolgate_common::{
        SharedBindingStore, SharedCredentialResolver, SharedProviderRuntime,
        types::{AgentToolBinding, CallerContext, ToolCall, ToolCallResult},
    },
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use toolgate_metrics::{counter, gateway as gateway_metrics, histogram, labels};

use crate::{
    error::{Error, Result},
    invoke::{ConnectOptions, invoke},
    router::TransportRouter,
    transform::ResponseTransformer,
};

/// Executes tool calls against MCP providers.
#[derive(Clone)]
pub struct ToolGateway {
    store: SharedBindingStore,
    router: TransportRouter,
    credentials: SharedCredentialResolver,
    transformer: ResponseTransformer,
    options: ConnectOptions,
}

impl ToolGateway {
    pub fn new(
        store: SharedBindingStore,
        runtime: SharedProviderRuntime,
        credentials: SharedCredentialResolver,
        options: ConnectOptions,
    ) -> Self {
        Self {
            store,
            router: TransportRouter::new(runtime),
            credentials,
            transformer: ResponseTransformer::default(),
            options,
        }
    }

    #[must_use]
    pub fn with_transformer(mut self, transformer: ResponseTransformer) -> Self {
        self.transformer = transformer;
        self
    }

    /// Execute one tool call. Failures come back as `is_error` results.
    pub async fn execute_tool_call(
        &self,
        call: &ToolCall,
        agent_id: &str,
        caller: &CallerContext,
        cancel: &CancellationToken,
    ) -> ToolCallResult {
        let started = Instant::now();
        let (transport, result) = match self.try_execute(call, agent_id, caller, cancel).await {
            Ok((transport, result)) => (transport, result),
            Err((transport, e)) => {
                warn!(
                    agent_id,
                    tool = %call.name,
                    error = %e,
                    "tool call failed"
                );
                (
                    transport,
                    ToolCallResult::failure(call.id.clone(), call.name.clone(), e.to_string()),
                )
            },
        };

        let outcome = if result.error.is_some() {
            "error"
        } else {
            "ok"
        };
        info!(
            agent_id,
            tool = %call.name,
            transport,
            outcome,
            is_error = result.is_error,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "tool call finished"
        );
        #[cfg(feature = "metrics")]
        {
            counter!(
                gateway_metrics::TOOL_CALLS_TOTAL,
                labels::TRANSPORT => transport,
                labels::OUTCOME => outcome
            )
            .increment(1);
            histogram!(gateway_metrics::TOOL_CALL_DURATION_SECONDS, labels::TRANSPORT => transport)
                .record(started.elapsed().as_secs_f64());
        }
        result
    }

    /// Execute several calls concurrently; results keep the input order.
    pub async fn execute_tool_calls(
        &self,
        calls: &[ToolCall],
        agent_id: &str,
        caller: &CallerContext,
        cancel: &CancellationToken,
    ) -> Vec<ToolCallResult> {
        join_all(
            calls
                .iter()
                .map(|call| self.execute_tool_call(call, agent_id, caller, cancel)),
        )
        .await
    }

    /// Returns the transport label alongside either outcome.
    async fn try_execute(
        &self,
        call: &ToolCall,
        agent_id: &str,
        caller: &CallerContext,
        cancel: &CancellationToken,
    ) -> std::result::Result<(&'static str, ToolCallResult), (&'static str, Error)> {
        let (_, bare_name) = call.split_name();

        let bound = self
            .store
            .binding_and_policies(agent_id, &call.name)
            .await
            .map_err(|e| ("none", Error::from(e)))?
            .ok_or_else(|| {
                (
                    "none",
                    Error::ToolNotFound {
                        agent_id: agent_id.to_string(),
                        tool: call.name.clone(),
                    },
                )
            })?;
        let binding = &bound.binding;

        let provider_id = self
            .execution_provider_id(binding, agent_id, caller)
            .await
            .map_err(|e| ("none", e))?;

        let target = self
            .router
            .resolve_transport(&provider_id)
            .await
            .map_err(|e| ("none", e))?;
        let transport = target.kind();

        debug!(
            agent_id,
            tool = %call.name,
            provider_id = %provider_id,
            transport,
            "dispatching tool call"
        );

        let raw = invoke(
            &target,
            bare_name,
            call.arguments.clone(),
            &self.options,
            cancel,
        )
        .await
        .map_err(|e| (transport, e))?;

        let content = self
            .transformer
            .transform(&Value::Array(raw.content), binding.response_template());

        Ok((
            transport,
            ToolCallResult::success(call.id.clone(), call.name.clone(), content, raw.is_error),
        ))
    }

    /// Execution source, then credential source, then the caller's team credential.
    async fn execution_provider_id(
        &self,
        binding: &AgentToolBinding,
        agent_id: &str,
        caller: &CallerContext,
    ) -> Result<String> {
        if let Some(id) = binding
            .execution_source_provider_id
            .as_deref()
            .or(binding.credential_source_provider_id.as_deref())
        {
            return Ok(id.to_string());
        }

        if binding.use_dynamic_team_credential {
            return self
                .credentials
                .resolve_dynamic_credential_provider(agent_id, caller)
                .await?
                .ok_or_else(|| Error::NoDynamicCredential {
                    agent_id: agent_id.to_string(),
                });
        }

        Err(Error::NoExecutionProvider {
            tool: binding.tool_name.clone(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use {
        super::*,
        serde_json::json,
        std::sync::Arc,
        toolgate_common::{
            InMemoryCatalog,
            types::{Provider, ServerType, TransportType},
        },
    };

    fn gateway(catalog: InMemoryCatalog) -> ToolGateway {
        let catalog = Arc::new(catalog);
        ToolGateway::new(
            catalog.clone(),
            catalog.clone(),
            catalog,
            ConnectOptions::default(),
        )
    }

    fn binding() -> AgentToolBinding {
        AgentToolBinding::new("b1", "agent", "gh__list_issues")
    }

    fn remote(id: &str, endpoint: Option<&str>) -> Provider {
        Provider {
            id: id.into(),
            name: id.into(),
            catalog_id: "cat".into(),
            server_type: ServerType::Remote,
            transport_type: TransportType::StreamableHttp,
            http_endpoint: endpoint.map(String::from),
        }
    }

    async fn provider_for(
        gateway: &ToolGateway,
        binding: &AgentToolBinding,
        team: Option<&str>,
    ) -> Result<String> {
        let caller = CallerContext {
            team_id: team.map(String::from),
            user_id: None,
        };
        gateway.execution_provider_id(binding, "agent", &caller).await
    }

    #[tokio::test]
    async fn execution_source_takes_precedence() {
        let gw = gateway(InMemoryCatalog::default());
        let mut b = binding();
        b.credential_source_provider_id = Some("cred".into());
        b.execution_source_provider_id = Some("exec".into());
        b.use_dynamic_team_credential = true;
        assert_eq!(provider_for(&gw, &b, None).await.unwrap(), "exec");

        b.execution_source_provider_id = None;
        assert_eq!(provider_for(&gw, &b, None).await.unwrap(), "cred");
    }

    #[tokio::test]
    async fn dynamic_team_credential() {
        let mut catalog = InMemoryCatalog::default();
        catalog.add_dynamic_credential("agent", "team-a", "team-a-provider");
        let gw = gateway(catalog);
        let mut b = binding();
        b.use_dynamic_team_credential = true;

        assert_eq!(
            provider_for(&gw, &b, Some("team-a")).await.unwrap(),
            "team-a-provider"
        );
        let err = provider_for(&gw, &b, Some("team-b")).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "No credential provider available for caller's team"
        );
    }

    #[tokio::test]
    async fn binding_without_any_provider() {
        let gw = gateway(InMemoryCatalog::default());
        let err = provider_for(&gw, &binding(), None).await.unwrap_err();
        assert!(matches!(err, Error::NoExecutionProvider { .. }));
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error_result() {
        let gw = gateway(InMemoryCatalog::default());
        let call = ToolCall::new("c1", "gh__list_issues", json!({}));
        let result = gw
            .execute_tool_call(&call, "agent", &CallerContext::default(), &CancellationToken::new())
            .await;
        assert!(result.is_error);
        assert_eq!(result.error.as_deref(), Some("Tool not found for agent"));
        assert_eq!(result.id, "c1");
        assert_eq!(result.name, "gh__list_issues");
    }

    #[tokio::test]
    async fn missing_http_endpoint_is_an_error_result() {
        let mut catalog = InMemoryCatalog::default();
        catalog.add_provider(remote("p1", None));
        let mut b = binding();
        b.execution_source_provider_id = Some("p1".into());
        catalog.add_binding(b, vec![]);

        let call = ToolCall::new("c1", "gh__list_issues", json!({}));
        let result = gateway(catalog)
            .execute_tool_call(&call, "agent", &CallerContext::default(), &CancellationToken::new())
            .await;
        assert!(result.is_error);
        assert_eq!(result.error.as_deref(), Some("No HTTP endpoint URL found"));
    }
}
