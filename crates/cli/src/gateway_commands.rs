//! `evaluate`, `call` and `render`: the gateway driven from local files.

use std::{path::Path, sync::Arc, time::Duration};

use {
    anyhow::{Context, Result},
    serde::de::DeserializeOwned,
    serde_json::Value,
    tokio_util::sync::CancellationToken,
    toolgate_common::types::{CallerContext, ToolCall},
    toolgate_config::{ToolgateConfig, build_catalog, load_or_discover},
    toolgate_mcp::{
        AttachOptions, ConnectOptions, HttpOptions, ResponseTransformer, ToolGateway,
        attach::default_attach_args, types::ClientInfo,
    },
    toolgate_policy::{PolicyEngine, PolicyVerdict},
    tracing::{info, warn},
};

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Map the config sections onto gateway connection options.
pub(crate) fn connect_options(config: &ToolgateConfig) -> ConnectOptions {
    let mut args = default_attach_args();
    args.extend(config.attach.extra_args.iter().cloned());

    ConnectOptions {
        client_info: ClientInfo {
            name: config.gateway.client_name.clone(),
            ..ClientInfo::default()
        },
        call_timeout: config.gateway.call_timeout(),
        http: HttpOptions {
            request_timeout: Duration::from_secs(config.http.request_timeout_secs),
            close_timeout: Duration::from_secs(config.http.close_timeout_secs),
        },
        attach: AttachOptions {
            command: config.attach.command.clone(),
            args,
            request_timeout: Duration::from_secs(config.attach.request_timeout_secs),
            ..AttachOptions::default()
        },
    }
}

pub async fn evaluate(
    config_path: Option<&Path>,
    agent_id: &str,
    calls_path: &Path,
    untrusted: bool,
) -> Result<()> {
    let config = load_or_discover(config_path)?;
    let catalog = Arc::new(build_catalog(&config)?);
    let calls: Vec<ToolCall> = read_json(calls_path)?;

    let verdict = PolicyEngine::new(catalog)
        .evaluate_batch(agent_id, &calls, !untrusted)
        .await?;
    print_json(&verdict)?;

    if !verdict.is_allowed {
        std::process::exit(2);
    }
    Ok(())
}

/// The blocking verdict for `call`, or `None` when policies let it through.
async fn policy_gate(
    engine: &PolicyEngine,
    agent_id: &str,
    call: &ToolCall,
    untrusted: bool,
) -> Result<Option<PolicyVerdict>> {
    let verdict = engine
        .evaluate_batch(agent_id, std::slice::from_ref(call), !untrusted)
        .await?;
    Ok((!verdict.is_allowed).then_some(verdict))
}

pub async fn call(
    config_path: Option<&Path>,
    agent_id: &str,
    call_path: &Path,
    team_id: Option<String>,
    timeout_secs: Option<u64>,
    untrusted: bool,
) -> Result<()> {
    let config = load_or_discover(config_path)?;
    let catalog = Arc::new(build_catalog(&config)?);
    let call: ToolCall = read_json(call_path)?;

    let engine = PolicyEngine::new(catalog.clone());
    if let Some(verdict) = policy_gate(&engine, agent_id, &call, untrusted).await? {
        warn!(tool = %call.name, reason = %verdict.reason, "tool call blocked by policy");
        print_json(&verdict)?;
        std::process::exit(2);
    }

    let mut options = connect_options(&config);
    if let Some(secs) = timeout_secs {
        options.call_timeout = Duration::from_secs(secs);
    }
    let gateway = ToolGateway::new(catalog.clone(), catalog.clone(), catalog, options);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling tool call");
            on_signal.cancel();
        }
    });

    let caller = CallerContext {
        team_id,
        user_id: None,
    };
    let result = gateway
        .execute_tool_call(&call, agent_id, &caller, &cancel)
        .await;
    info!(tool = %call.name, is_error = result.is_error, "call complete");
    print_json(&result)
}

pub fn render(template_path: &Path, content_path: &Path) -> Result<()> {
    let template = std::fs::read_to_string(template_path)
        .with_context(|| format!("failed to read {}", template_path.display()))?;
    let content: Value = read_json(content_path)?;

    let rendered = ResponseTransformer::default().transform(&content, Some(&template));
    print_json(&rendered)
}
