//! Batch verdicts for tool calls.
//!
//! Evaluation walks the batch in order and stops at the first tool call that
//! is blocked; that call decides the verdict for the whole batch. Within a
//! single tool, a matching `block_always` policy always wins over allow rules
//! and over the binding's untrusted-data permission.

use {
    serde::{Deserialize, Serialize},
    toolgate_common::{
        SharedBindingStore,
        types::{BindingWithPolicies, InvocationPolicy, PolicyAction, ToolCall},
    },
    tracing::{debug, info},
};

#[cfg(feature = "metrics")]
use toolgate_metrics::{counter, labels, policy as policy_metrics};

use crate::{error::Result, operator::matches, resolver::resolve_argument};

pub const UNTRUSTED_CONTEXT_REASON: &str =
    "Tool invocation blocked: context contains untrusted data";
pub const TOOL_NOT_FOUND_REASON: &str = "Tool not found for agent";

/// Verdict for a whole batch of tool calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyVerdict {
    pub is_allowed: bool,
    /// Name of the first tool call that was blocked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_name: Option<String>,
    pub reason: String,
}

impl PolicyVerdict {
    pub fn allowed() -> Self {
        Self {
            is_allowed: true,
            tool_call_name: None,
            reason: String::new(),
        }
    }

    pub fn blocked(tool_call_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            is_allowed: false,
            tool_call_name: Some(tool_call_name.into()),
            reason: reason.into(),
        }
    }
}

/// Why a tool call was blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// A `block_always` policy matched.
    Policy,
    /// An allow rule needed an argument the call did not carry.
    MissingArgument,
    /// Untrusted context and nothing permitted the call.
    UntrustedContext,
    /// No binding exists for the agent and tool.
    UnknownTool,
}

impl BlockKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Policy => "policy",
            Self::MissingArgument => "missing_argument",
            Self::UntrustedContext => "untrusted_context",
            Self::UnknownTool => "unknown_tool",
        }
    }
}

/// Decision for a single tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolDecision {
    Allowed,
    Blocked { kind: BlockKind, reason: String },
}

impl ToolDecision {
    fn blocked(kind: BlockKind, reason: impl Into<String>) -> Self {
        Self::Blocked {
            kind,
            reason: reason.into(),
        }
    }
}

fn block_reason(policy: &InvocationPolicy) -> String {
    if policy.reason.trim().is_empty() {
        format!(
            "Policy violation: {} {} {}",
            policy.argument_path, policy.operator, policy.value
        )
    } else {
        policy.reason.clone()
    }
}

/// Decide a single tool call against its binding and ordered policies.
///
/// Pure: no I/O, no shared state.
pub fn evaluate_tool_call(
    call: &ToolCall,
    bound: &BindingWithPolicies,
    is_context_trusted: bool,
) -> ToolDecision {
    let mut allowed =
        is_context_trusted || bound.binding.allow_usage_when_untrusted_data_is_present;

    for policy in &bound.policies {
        let Some(value) = resolve_argument(&call.arguments, &policy.argument_path) else {
            if policy.action == PolicyAction::AllowWhenContextIsUntrusted && !is_context_trusted
            {
                return ToolDecision::blocked(
                    BlockKind::MissingArgument,
                    format!("Missing required argument: {}", policy.argument_path),
                );
            }
            continue;
        };

        if !matches(policy.operator, value, &policy.value) {
            continue;
        }

        match policy.action {
            PolicyAction::BlockAlways => {
                return ToolDecision::blocked(BlockKind::Policy, block_reason(policy));
            },
            PolicyAction::AllowWhenContextIsUntrusted => allowed = true,
        }
    }

    if allowed {
        ToolDecision::Allowed
    } else {
        ToolDecision::blocked(BlockKind::UntrustedContext, UNTRUSTED_CONTEXT_REASON)
    }
}

/// Evaluates batches of tool calls against the binding store.
#[derive(Clone)]
pub struct PolicyEngine {
    store: SharedBindingStore,
}

impl PolicyEngine {
    pub fn new(store: SharedBindingStore) -> Self {
        Self { store }
    }

    /// Judge `tool_calls` in order; the first blocked call decides the batch.
    ///
    /// Errors only when the binding store itself fails.
    pub async fn evaluate_batch(
        &self,
        agent_id: &str,
        tool_calls: &[ToolCall],
        is_context_trusted: bool,
    ) -> Result<PolicyVerdict> {
        for call in tool_calls {
            if self.store.is_builtin_tool(&call.name) {
                debug!(tool = %call.name, "built-in tool, skipping policies");
                continue;
            }

            let decision = match self
                .store
                .binding_and_policies(agent_id, &call.name)
                .await?
            {
                Some(bound) => evaluate_tool_call(call, &bound, is_context_trusted),
                None => ToolDecision::blocked(BlockKind::UnknownTool, TOOL_NOT_FOUND_REASON),
            };

            if let ToolDecision::Blocked { kind, reason } = decision {
                info!(
                    agent_id,
                    tool = %call.name,
                    kind = kind.as_str(),
                    reason = %reason,
                    trusted = is_context_trusted,
                    "tool call blocked"
                );
                #[cfg(feature = "metrics")]
                {
                    counter!(policy_metrics::EVALUATIONS_TOTAL, labels::OUTCOME => "blocked")
                        .increment(1);
                    counter!(policy_metrics::BLOCKS_TOTAL, labels::KIND => kind.as_str())
                        .increment(1);
                }
                return Ok(PolicyVerdict::blocked(call.name.clone(), reason));
            }
        }

        debug!(agent_id, count = tool_calls.len(), "tool call batch allowed");
        #[cfg(feature = "metrics")]
        counter!(policy_metrics::EVALUATIONS_TOTAL, labels::OUTCOME => "allowed").increment(1);
        Ok(PolicyVerdict::allowed())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use {
        super::*,
        serde_json::json,
        toolgate_common::types::{AgentToolBinding, PolicyOperator},
    };

    fn bound(allow_untrusted: bool, policies: Vec<InvocationPolicy>) -> BindingWithPolicies {
        let mut binding = AgentToolBinding::new("b1", "agent", "mail__send");
        binding.allow_usage_when_untrusted_data_is_present = allow_untrusted;
        BindingWithPolicies { binding, policies }
    }

    fn policy(
        path: &str,
        operator: PolicyOperator,
        value: &str,
        action: PolicyAction,
        reason: &str,
    ) -> InvocationPolicy {
        InvocationPolicy {
            id: format!("{path}-{value}"),
            agent_tool_binding_id: "b1".into(),
            argument_path: path.into(),
            operator,
            value: value.into(),
            action,
            reason: reason.into(),
        }
    }

    fn call(args: serde_json::Value) -> ToolCall {
        ToolCall::new("c1", "mail__send", args)
    }

    #[test]
    fn trusted_context_without_policies_is_allowed() {
        assert_eq!(
            evaluate_tool_call(&call(json!({})), &bound(false, vec![]), true),
            ToolDecision::Allowed
        );
    }

    #[test]
    fn untrusted_context_respects_binding_permission() {
        assert_eq!(
            evaluate_tool_call(&call(json!({})), &bound(true, vec![]), false),
            ToolDecision::Allowed
        );
        assert_eq!(
            evaluate_tool_call(&call(json!({})), &bound(false, vec![]), false),
            ToolDecision::blocked(BlockKind::UntrustedContext, UNTRUSTED_CONTEXT_REASON)
        );
    }

    #[test]
    fn block_wins_regardless_of_order() {
        let allow = policy(
            "to",
            PolicyOperator::EndsWith,
            "@evil.com",
            PolicyAction::AllowWhenContextIsUntrusted,
            "",
        );
        let block = policy(
            "to",
            PolicyOperator::Contains,
            "evil",
            PolicyAction::BlockAlways,
            "no evil",
        );
        let args = json!({"to": "x@evil.com"});
        for policies in [vec![allow.clone(), block.clone()], vec![block, allow]] {
            assert_eq!(
                evaluate_tool_call(&call(args.clone()), &bound(true, policies), false),
                ToolDecision::blocked(BlockKind::Policy, "no evil")
            );
        }
    }

    #[test]
    fn matching_allow_rule_overrides_untrusted_baseline() {
        let allow = policy(
            "to",
            PolicyOperator::EndsWith,
            "@corp.com",
            PolicyAction::AllowWhenContextIsUntrusted,
            "",
        );
        assert_eq!(
            evaluate_tool_call(
                &call(json!({"to": "a@corp.com"})),
                &bound(false, vec![allow.clone()]),
                false
            ),
            ToolDecision::Allowed
        );
        assert_eq!(
            evaluate_tool_call(
                &call(json!({"to": "a@else.com"})),
                &bound(false, vec![allow]),
                false
            ),
            ToolDecision::blocked(BlockKind::UntrustedContext, UNTRUSTED_CONTEXT_REASON)
        );
    }

    #[test]
    fn missing_argument_semantics() {
        let block = policy(
            "to",
            PolicyOperator::Equal,
            "x",
            PolicyAction::BlockAlways,
            "blocked",
        );
        assert_eq!(
            evaluate_tool_call(&call(json!({})), &bound(false, vec![block]), true),
            ToolDecision::Allowed
        );

        let allow = policy(
            "user.email",
            PolicyOperator::EndsWith,
            "@corp.com",
            PolicyAction::AllowWhenContextIsUntrusted,
            "",
        );
        assert_eq!(
            evaluate_tool_call(&call(json!({})), &bound(true, vec![allow.clone()]), false),
            ToolDecision::blocked(
                BlockKind::MissingArgument,
                "Missing required argument: user.email"
            )
        );
        assert_eq!(
            evaluate_tool_call(&call(json!({})), &bound(false, vec![allow]), true),
            ToolDecision::Allowed
        );
    }

    #[test]
    fn empty_reason_gets_a_description() {
        let block = policy(
            "path",
            PolicyOperator::StartsWith,
            "/etc",
            PolicyAction::BlockAlways,
            "",
        );
        assert_eq!(
            evaluate_tool_call(
                &call(json!({"path": "/etc/shadow"})),
                &bound(true, vec![block]),
                true
            ),
            ToolDecision::blocked(BlockKind::Policy, "Policy violation: path startsWith /etc")
        );
    }

    #[test]
    fn verdict_serialization() {
        let v = serde_json::to_value(PolicyVerdict::allowed()).unwrap_or_default();
        assert_eq!(v, json!({"isAllowed": true, "reason": ""}));
        let v = serde_json::to_value(PolicyVerdict::blocked("a__b", "nope")).unwrap_or_default();
        assert_eq!(v, json!({"isAllowed": false, "toolCallName": "a__b", "reason": "nope"}));
    }
}
