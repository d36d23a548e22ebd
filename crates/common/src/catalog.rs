//! Read-only collaborator interfaces over externally owned records.
//!
//! The policy engine and the tool gateway only depend on these traits, so
//! the backing store (database, config file, remote API) is swappable.

use std::sync::Arc;

use {async_trait::async_trait, secrecy::Secret};

use crate::{
    error::Result,
    types::{AttachTarget, BindingWithPolicies, CallerContext},
};

/// Binding and policy lookups.
#[async_trait]
pub trait BindingStore: Send + Sync {
    /// The binding for `(agent_id, tool_name)` with its policies in creation order.
    async fn binding_and_policies(
        &self,
        agent_id: &str,
        tool_name: &str,
    ) -> Result<Option<BindingWithPolicies>>;

    /// First-party tools bypass invocation policies entirely.
    fn is_builtin_tool(&self, tool_name: &str) -> bool;
}

/// Live state of running provider instances.
#[async_trait]
pub trait ProviderRuntime: Send + Sync {
    async fn uses_streamable_http(&self, provider_id: &str) -> Result<bool>;

    async fn http_endpoint_url(&self, provider_id: &str) -> Result<Option<String>>;

    async fn attach_target(&self, provider_id: &str) -> Result<AttachTarget>;

    /// Bearer token to present to an HTTP provider, if it needs one.
    async fn http_auth_token(&self, _provider_id: &str) -> Result<Option<Secret<String>>> {
        Ok(None)
    }
}

/// Resolves a provider for tools that use per-team credentials.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    async fn resolve_dynamic_credential_provider(
        &self,
        agent_id: &str,
        caller: &CallerContext,
    ) -> Result<Option<String>>;
}

pub type SharedBindingStore = Arc<dyn BindingStore>;
pub type SharedProviderRuntime = Arc<dyn ProviderRuntime>;
pub type SharedCredentialResolver = Arc<dyn CredentialResolver>;
