//! Builds the in-memory catalog the gateway reads from a loaded config.

use {
    anyhow::Context,
    toolgate_common::{
        InMemoryCatalog,
        types::{AgentToolBinding, InvocationPolicy},
    },
    tracing::debug,
};

use crate::schema::{BindingConfig, ToolgateConfig};

pub fn build_catalog(config: &ToolgateConfig) -> anyhow::Result<InMemoryCatalog> {
    let mut catalog = InMemoryCatalog::new(config.gateway.builtin_tool_prefix.clone())
        .with_default_namespace(config.attach.default_namespace.clone());

    for p in &config.providers {
        catalog.add_provider(p.to_provider());
        if let Some(attach) = &p.attach {
            catalog
                .set_attach_target(&p.id, attach.into())
                .with_context(|| format!("provider '{}'", p.id))?;
        }
        if let Some(token) = &p.auth_token {
            catalog
                .set_auth_token(&p.id, token.clone())
                .with_context(|| format!("provider '{}'", p.id))?;
        }
    }

    for b in &config.bindings {
        let (binding, policies) = binding_from_config(b);
        catalog.add_binding(binding, policies);
    }

    for d in &config.dynamic_credentials {
        catalog.add_dynamic_credential(&d.agent_id, &d.team_id, &d.provider_id);
    }

    debug!(
        providers = config.providers.len(),
        bindings = config.bindings.len(),
        dynamic_credentials = config.dynamic_credentials.len(),
        "catalog built from config"
    );
    Ok(catalog)
}

fn binding_from_config(cfg: &BindingConfig) -> (AgentToolBinding, Vec<InvocationPolicy>) {
    let binding_id = cfg.binding_id();
    let policies = cfg
        .policies
        .iter()
        .enumerate()
        .map(|(i, p)| InvocationPolicy {
            id: p.id.clone().unwrap_or_else(|| format!("{binding_id}#{i}")),
            agent_tool_binding_id: binding_id.clone(),
            argument_path: p.argument_path.clone(),
            operator: p.operator,
            value: p.value.clone(),
            action: p.action,
            reason: p.reason.clone(),
        })
        .collect();

    let binding = AgentToolBinding {
        id: binding_id,
        agent_id: cfg.agent_id.clone(),
        tool_name: cfg.tool_name.clone(),
        allow_usage_when_untrusted_data_is_present: cfg.allow_usage_when_untrusted_data_is_present,
        tool_result_treatment: cfg.tool_result_treatment,
        response_modifier_template: cfg.response_modifier_template.clone(),
        credential_source_provider_id: cfg.credential_source_provider_id.clone(),
        execution_source_provider_id: cfg.execution_source_provider_id.clone(),
        use_dynamic_team_credential: cfg.use_dynamic_team_credential,
    };
    (binding, policies)
}
