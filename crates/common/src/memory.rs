//! In-memory catalog backing all collaborator traits.
//!
//! Used by the CLI (populated from the config file) and by tests.

use std::collections::HashMap;

use {async_trait::async_trait, secrecy::Secret, tracing::debug};

use crate::{
    catalog::{BindingStore, CredentialResolver, ProviderRuntime},
    error::{Error, Result},
    types::{
        AgentToolBinding, AttachTarget, BindingWithPolicies, CallerContext, InvocationPolicy,
        Provider,
    },
};

/// Container name of a provider's stdio process inside its pod.
pub const DEFAULT_ATTACH_CHANNEL: &str = "mcp-server";

#[derive(Debug, Clone)]
struct ProviderEntry {
    provider: Provider,
    attach: Option<AttachTarget>,
    auth_token: Option<Secret<String>>,
}

/// Static, read-only after construction.
#[derive(Debug, Clone)]
pub struct InMemoryCatalog {
    builtin_prefix: String,
    default_namespace: String,
    bindings: HashMap<(String, String), BindingWithPolicies>,
    providers: HashMap<String, ProviderEntry>,
    dynamic_credentials: HashMap<(String, String), String>,
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new("toolgate__")
    }
}

impl InMemoryCatalog {
    pub fn new(builtin_prefix: impl Into<String>) -> Self {
        Self {
            builtin_prefix: builtin_prefix.into(),
            default_namespace: "default".into(),
            bindings: HashMap::new(),
            providers: HashMap::new(),
            dynamic_credentials: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_default_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.default_namespace = namespace.into();
        self
    }

    /// Register a binding. Policies keep the order they are given in.
    pub fn add_binding(&mut self, binding: AgentToolBinding, policies: Vec<InvocationPolicy>) {
        let key = (binding.agent_id.clone(), binding.tool_name.clone());
        self.bindings
            .insert(key, BindingWithPolicies { binding, policies });
    }

    pub fn add_provider(&mut self, provider: Provider) {
        self.providers.insert(provider.id.clone(), ProviderEntry {
            provider,
            attach: None,
            auth_token: None,
        });
    }

    /// Override the derived attach target for a provider.
    pub fn set_attach_target(&mut self, provider_id: &str, target: AttachTarget) -> Result<()> {
        self.entry_mut(provider_id)?.attach = Some(target);
        Ok(())
    }

    pub fn set_auth_token(&mut self, provider_id: &str, token: Secret<String>) -> Result<()> {
        self.entry_mut(provider_id)?.auth_token = Some(token);
        Ok(())
    }

    pub fn add_dynamic_credential(
        &mut self,
        agent_id: impl Into<String>,
        team_id: impl Into<String>,
        provider_id: impl Into<String>,
    ) {
        self.dynamic_credentials
            .insert((agent_id.into(), team_id.into()), provider_id.into());
    }

    pub fn provider(&self, provider_id: &str) -> Option<&Provider> {
        self.providers.get(provider_id).map(|e| &e.provider)
    }

    fn entry(&self, provider_id: &str) -> Result<&ProviderEntry> {
        self.providers
            .get(provider_id)
            .ok_or_else(|| Error::UnknownProvider {
                provider_id: provider_id.to_string(),
            })
    }

    fn entry_mut(&mut self, provider_id: &str) -> Result<&mut ProviderEntry> {
        self.providers
            .get_mut(provider_id)
            .ok_or_else(|| Error::UnknownProvider {
                provider_id: provider_id.to_string(),
            })
    }
}

/// Pod names are derived from the provider name: lowercase, `[a-z0-9-]`.
fn pod_name_for(provider: &Provider) -> String {
    let base = if provider.name.is_empty() {
        &provider.id
    } else {
        &provider.name
    };
    let slug: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    format!("mcp-{}", slug.trim_matches('-'))
}

#[async_trait]
impl BindingStore for InMemoryCatalog {
    async fn binding_and_policies(
        &self,
        agent_id: &str,
        tool_name: &str,
    ) -> Result<Option<BindingWithPolicies>> {
        Ok(self
            .bindings
            .get(&(agent_id.to_string(), tool_name.to_string()))
            .cloned())
    }

    fn is_builtin_tool(&self, tool_name: &str) -> bool {
        !self.builtin_prefix.is_empty() && tool_name.starts_with(&self.builtin_prefix)
    }
}

#[async_trait]
impl ProviderRuntime for InMemoryCatalog {
    async fn uses_streamable_http(&self, provider_id: &str) -> Result<bool> {
        Ok(self.entry(provider_id)?.provider.speaks_http())
    }

    async fn http_endpoint_url(&self, provider_id: &str) -> Result<Option<String>> {
        Ok(self
            .entry(provider_id)?
            .provider
            .http_endpoint
            .clone()
            .filter(|url| !url.trim().is_empty()))
    }

    async fn attach_target(&self, provider_id: &str) -> Result<AttachTarget> {
        let entry = self.entry(provider_id)?;
        if let Some(target) = &entry.attach {
            return Ok(target.clone());
        }
        let target = AttachTarget {
            namespace: self.default_namespace.clone(),
            pod_name: pod_name_for(&entry.provider),
            channel: DEFAULT_ATTACH_CHANNEL.into(),
        };
        debug!(provider_id, pod = %target.pod_name, "derived attach target");
        Ok(target)
    }

    async fn http_auth_token(&self, provider_id: &str) -> Result<Option<Secret<String>>> {
        Ok(self.entry(provider_id)?.auth_token.clone())
    }
}

#[async_trait]
impl CredentialResolver for InMemoryCatalog {
    async fn resolve_dynamic_credential_provider(
        &self,
        agent_id: &str,
        caller: &CallerContext,
    ) -> Result<Option<String>> {
        let Some(team_id) = caller.team_id.as_deref() else {
            return Ok(None);
        };
        Ok(self
            .dynamic_credentials
            .get(&(agent_id.to_string(), team_id.to_string()))
            .cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{ServerType, TransportType};

    fn provider(id: &str, name: &str) -> Provider {
        Provider {
            id: id.into(),
            name: name.into(),
            catalog_id: "cat".into(),
            server_type: ServerType::Local,
            transport_type: TransportType::Stdio,
            http_endpoint: None,
        }
    }

    #[tokio::test]
    async fn binding_lookup_is_per_agent() {
        let mut catalog = InMemoryCatalog::default();
        catalog.add_binding(AgentToolBinding::new("b1", "agent-a", "gh__issues"), vec![]);

        assert!(
            catalog
                .binding_and_policies("agent-a", "gh__issues")
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            catalog
                .binding_and_policies("agent-b", "gh__issues")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn builtin_prefix() {
        let catalog = InMemoryCatalog::new("toolgate__");
        assert!(catalog.is_builtin_tool("toolgate__whoami"));
        assert!(!catalog.is_builtin_tool("github__whoami"));
        assert!(!InMemoryCatalog::new("").is_builtin_tool("anything"));
    }

    #[tokio::test]
    async fn derived_attach_target() {
        let mut catalog = InMemoryCatalog::default().with_default_namespace("mcp");
        catalog.add_provider(provider("p1", "GitHub Server"));
        let target = catalog.attach_target("p1").await.unwrap();
        assert_eq!(target.namespace, "mcp");
        assert_eq!(target.pod_name, "mcp-github-server");
        assert_eq!(target.channel, DEFAULT_ATTACH_CHANNEL);
    }

    #[tokio::test]
    async fn unknown_provider_errors() {
        let catalog = InMemoryCatalog::default();
        let err = catalog.uses_streamable_http("nope").await.unwrap_err();
        assert!(matches!(err, Error::UnknownProvider { .. }));
    }

    #[tokio::test]
    async fn blank_endpoint_counts_as_missing() {
        let mut catalog = InMemoryCatalog::default();
        let mut p = provider("p1", "remote");
        p.server_type = ServerType::Remote;
        p.http_endpoint = Some(" ".into());
        catalog.add_provider(p);
        assert!(catalog.uses_streamable_http("p1").await.unwrap());
        assert_eq!(catalog.http_endpoint_url("p1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn dynamic_credentials_need_a_team() {
        let mut catalog = InMemoryCatalog::default();
        catalog.add_dynamic_credential("agent", "team-1", "p-team");
        let caller = CallerContext {
            team_id: Some("team-1".into()),
            user_id: None,
        };
        assert_eq!(
            catalog
                .resolve_dynamic_credential_provider("agent", &caller)
                .await
                .unwrap()
                .as_deref(),
            Some("p-team")
        );
        assert_eq!(
            catalog
                .resolve_dynamic_credential_provider("agent", &CallerContext::default())
                .await
                .unwrap(),
            None
        );
    }
}
