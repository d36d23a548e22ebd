//! Config schema types (gateway, transports, providers, bindings).

use std::time::Duration;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    toolgate_common::types::{
        AttachTarget, PolicyAction, PolicyOperator, Provider, ServerType, ToolResultTreatment,
        TransportType,
    },
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolgateConfig {
    pub gateway: GatewayConfig,
    pub http: HttpConfig,
    pub attach: AttachConfig,
    pub providers: Vec<ProviderConfig>,
    pub bindings: Vec<BindingConfig>,
    pub dynamic_credentials: Vec<DynamicCredentialConfig>,
}

impl ToolgateConfig {
    pub fn provider(&self, id: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.id == id)
    }
}

/// Gateway behaviour shared by every call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Upper bound for handshake plus tool call, in seconds.
    pub call_timeout_secs: u64,
    /// Name sent as `clientInfo.name` during `initialize`.
    pub client_name: String,
    /// Tools with this prefix are handled by the host and skip policy checks.
    pub builtin_tool_prefix: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: 60,
            client_name: "toolgate".into(),
            builtin_tool_prefix: "toolgate__".into(),
        }
    }
}

impl GatewayConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub request_timeout_secs: u64,
    /// Bound for the session DELETE sent on close.
    pub close_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 60,
            close_timeout_secs: 5,
        }
    }
}

/// How attach sessions to in-cluster stdio providers are opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachConfig {
    pub command: String,
    /// Appended after the rendered attach arguments.
    pub extra_args: Vec<String>,
    /// Namespace used when a provider has no explicit attach target.
    pub default_namespace: String,
    pub request_timeout_secs: u64,
}

impl Default for AttachConfig {
    fn default() -> Self {
        Self {
            command: "kubectl".into(),
            extra_args: Vec::new(),
            default_namespace: "default".into(),
            request_timeout_secs: 30,
        }
    }
}

/// An MCP server installation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub catalog_id: String,
    #[serde(default = "default_server_type")]
    pub server_type: ServerType,
    #[serde(default = "default_transport_type")]
    pub transport_type: TransportType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_endpoint: Option<String>,
    /// Bearer token sent to remote providers.
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub auth_token: Option<Secret<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attach: Option<AttachTargetConfig>,
}

impl ProviderConfig {
    /// The catalog record for this provider. An empty name falls back to the id.
    pub fn to_provider(&self) -> Provider {
        Provider {
            id: self.id.clone(),
            name: if self.name.is_empty() {
                self.id.clone()
            } else {
                self.name.clone()
            },
            catalog_id: self.catalog_id.clone(),
            server_type: self.server_type,
            transport_type: self.transport_type,
            http_endpoint: self.http_endpoint.clone(),
        }
    }
}

fn default_server_type() -> ServerType {
    ServerType::Remote
}

fn default_transport_type() -> TransportType {
    TransportType::StreamableHttp
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachTargetConfig {
    pub namespace: String,
    pub pod_name: String,
    #[serde(default = "default_channel")]
    pub channel: String,
}

fn default_channel() -> String {
    toolgate_common::memory::DEFAULT_ATTACH_CHANNEL.into()
}

impl From<&AttachTargetConfig> for AttachTarget {
    fn from(cfg: &AttachTargetConfig) -> Self {
        Self {
            namespace: cfg.namespace.clone(),
            pod_name: cfg.pod_name.clone(),
            channel: cfg.channel.clone(),
        }
    }
}

/// A tool bound to an agent, with its invocation policies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingConfig {
    /// Defaults to `<agent_id>:<tool_name>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub agent_id: String,
    pub tool_name: String,
    #[serde(default)]
    pub allow_usage_when_untrusted_data_is_present: bool,
    #[serde(default)]
    pub tool_result_treatment: ToolResultTreatment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_modifier_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_source_provider_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_source_provider_id: Option<String>,
    #[serde(default)]
    pub use_dynamic_team_credential: bool,
    #[serde(default)]
    pub policies: Vec<PolicyConfig>,
}

impl BindingConfig {
    pub fn binding_id(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("{}:{}", self.agent_id, self.tool_name))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub argument_path: String,
    pub operator: PolicyOperator,
    pub value: String,
    pub action: PolicyAction,
    #[serde(default)]
    pub reason: String,
}

/// Maps an agent and a caller's team to the provider holding that team's credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicCredentialConfig {
    pub agent_id: String,
    pub team_id: String,
    pub provider_id: String,
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}
