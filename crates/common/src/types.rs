//! Data model shared by the policy engine and the tool gateway.
//!
//! Records here are owned by an external store; this workspace only reads
//! them. JSON field names follow the camelCase used by the management API.

use {
    serde::{Deserialize, Serialize},
    serde_json::Value,
};

/// Separator between the provider prefix and the bare tool name.
pub const TOOL_NAME_SEPARATOR: &str = "__";

// ── Tool calls ──────────────────────────────────────────────────────────────

/// A single tool invocation requested by an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    /// `<providerName>__<toolName>`.
    pub name: String,
    #[serde(default = "empty_object")]
    pub arguments: Value,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Split the prefixed name into `(provider_prefix, bare_tool_name)`.
    ///
    /// The split happens at the first separator. A name without a separator
    /// has no provider prefix.
    pub fn split_name(&self) -> (Option<&str>, &str) {
        split_tool_name(&self.name)
    }
}

/// Split `<provider>__<tool>` at the first separator.
pub fn split_tool_name(name: &str) -> (Option<&str>, &str) {
    match name.split_once(TOOL_NAME_SEPARATOR) {
        Some((provider, tool)) if !provider.is_empty() && !tool.is_empty() => {
            (Some(provider), tool)
        },
        _ => (None, name),
    }
}

/// Outcome of a single tool invocation. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    pub id: String,
    pub name: String,
    /// Provider content items, or whatever the response template produced.
    pub content: Value,
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolCallResult {
    pub fn success(
        id: impl Into<String>,
        name: impl Into<String>,
        content: Value,
        is_error: bool,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            content,
            is_error,
            error: None,
        }
    }

    /// An error result with empty content.
    pub fn failure(
        id: impl Into<String>,
        name: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            content: Value::Array(Vec::new()),
            is_error: true,
            error: Some(error.into()),
        }
    }
}

// ── Bindings and policies ───────────────────────────────────────────────────

/// How the orchestration layer should treat a tool's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolResultTreatment {
    Trusted,
    #[default]
    Untrusted,
    SanitizeWithDualLlm,
}

/// Association between an agent and a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentToolBinding {
    pub id: String,
    pub agent_id: String,
    /// Full prefixed tool name.
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
}

impl AgentToolBinding {
    pub fn new(
        id: impl Into<String>,
        agent_id: impl Into<String>,
        tool_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            agent_id: agent_id.into(),
            tool_name: tool_name.into(),
            allow_usage_when_untrusted_data_is_present: false,
            tool_result_treatment: ToolResultTreatment::default(),
            response_modifier_template: None,
            credential_source_provider_id: None,
            execution_source_provider_id: None,
            use_dynamic_team_credential: false,
        }
    }

    /// Template text, ignoring blank templates.
    pub fn response_template(&self) -> Option<&str> {
        self.response_modifier_template
            .as_deref()
            .filter(|t| !t.trim().is_empty())
    }
}

/// Comparison applied between a resolved argument and a policy value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PolicyOperator {
    Equal,
    NotEqual,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    Regex,
}

impl PolicyOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::NotEqual => "notEqual",
            Self::Contains => "contains",
            Self::NotContains => "notContains",
            Self::StartsWith => "startsWith",
            Self::EndsWith => "endsWith",
            Self::Regex => "regex",
        }
    }
}

impl std::fmt::Display for PolicyOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a matching policy does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyAction {
    BlockAlways,
    AllowWhenContextIsUntrusted,
}

/// An administrator-defined rule on one argument of a bound tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationPolicy {
    pub id: String,
    pub agent_tool_binding_id: String,
    /// Dotted path into the call arguments, e.g. `user.email`.
    pub argument_path: String,
    pub operator: PolicyOperator,
    pub value: String,
    pub action: PolicyAction,
    #[serde(default)]
    pub reason: String,
}

/// A binding together with its policies in creation order.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingWithPolicies {
    pub binding: AgentToolBinding,
    pub policies: Vec<InvocationPolicy>,
}

// ── Providers ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerType {
    #[default]
    Local,
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportType {
    #[default]
    Stdio,
    StreamableHttp,
}

/// An MCP server instance tools are executed against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub catalog_id: String,
    #[serde(default)]
    pub server_type: ServerType,
    #[serde(default)]
    pub transport_type: TransportType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_endpoint: Option<String>,
}

impl Provider {
    /// Remote servers and local servers speaking streamable HTTP are reached
    /// over HTTP; everything else through the attach channel.
    pub fn speaks_http(&self) -> bool {
        self.server_type == ServerType::Remote
            || self.transport_type == TransportType::StreamableHttp
    }
}

/// Where a running stdio provider instance can be attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachTarget {
    pub namespace: String,
    pub pod_name: String,
    /// Container (stream owner) inside the pod.
    pub channel: String,
}

/// Identity of whoever triggered the call, used for dynamic credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn split_at_first_separator() {
        assert_eq!(split_tool_name("github__list_issues"), (Some("github"), "list_issues"));
        assert_eq!(split_tool_name("a__b__c"), (Some("a"), "b__c"));
        assert_eq!(split_tool_name("plain"), (None, "plain"));
        assert_eq!(split_tool_name("__tool"), (None, "__tool"));
    }

    #[test]
    fn tool_call_defaults_to_empty_arguments() {
        let call: ToolCall = serde_json::from_str(r#"{"id":"1","name":"x__y"}"#).unwrap();
        assert_eq!(call.arguments, json!({}));
    }

    #[test]
    fn policy_wire_names() {
        let policy: InvocationPolicy = serde_json::from_value(json!({
            "id": "p1",
            "agentToolBindingId": "b1",
            "argumentPath": "email",
            "operator": "endsWith",
            "value": "@evil.com",
            "action": "block_always",
            "reason": "no"
        }))
        .unwrap();
        assert_eq!(policy.operator, PolicyOperator::EndsWith);
        assert_eq!(policy.action, PolicyAction::BlockAlways);
    }

    #[test]
    fn result_omits_missing_error() {
        let ok = ToolCallResult::success("1", "a__b", json!([]), false);
        let v = serde_json::to_value(&ok).unwrap();
        assert!(v.get("error").is_none());
        assert_eq!(v["isError"], false);

        let err = ToolCallResult::failure("1", "a__b", "boom");
        assert_eq!(err.error.as_deref(), Some("boom"));
        assert!(err.is_error);
    }

    #[test]
    fn provider_transport_kind() {
        let mut provider = Provider {
            id: "p".into(),
            name: "p".into(),
            catalog_id: "c".into(),
            server_type: ServerType::Local,
            transport_type: TransportType::Stdio,
            http_endpoint: None,
        };
        assert!(!provider.speaks_http());
        provider.transport_type = TransportType::StreamableHttp;
        assert!(provider.speaks_http());
        provider.transport_type = TransportType::Stdio;
        provider.server_type = ServerType::Remote;
        assert!(provider.speaks_http());
    }

    #[test]
    fn blank_template_is_ignored() {
        let mut binding = AgentToolBinding::new("b", "a", "x__y");
        binding.response_modifier_template = Some("   ".into());
        assert_eq!(binding.response_template(), None);
        binding.response_modifier_template = Some("{{response}}".into());
        assert_eq!(binding.response_template(), Some("{{response}}"));
    }
}
