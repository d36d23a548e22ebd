//! Configuration validation engine.
//!
//! Detects unknown/misspelled fields, then checks the parsed config for
//! references and values the gateway would trip over at call time.

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};

use {
    serde_json::Value,
    toolgate_common::types::{PolicyOperator, split_tool_name},
};

use crate::{env_subst::substitute_env, schema::ToolgateConfig};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "duplicate-binding",
    /// "duplicate-provider", "unknown-provider", "invalid-regex", "tool-name",
    /// "missing-endpoint", "dynamic-credential", "no-provider", "template", "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "bindings[0].policies[1].value"
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn new(
        severity: Severity,
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result of validating a configuration file.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

// ── Schema tree for unknown-field detection ─────────────────────────────────

enum KnownKeys {
    Struct(HashMap<&'static str, KnownKeys>),
    Array(Box<KnownKeys>),
    Leaf,
}

fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Array, Leaf, Struct};

    let fields = |names: &[&'static str]| {
        names
            .iter()
            .map(|n| (*n, Leaf))
            .collect::<HashMap<_, _>>()
    };

    let mut provider = fields(&[
        "id",
        "name",
        "catalog_id",
        "server_type",
        "transport_type",
        "http_endpoint",
        "auth_token",
    ]);
    provider.insert("attach", Struct(fields(&["namespace", "pod_name", "channel"])));

    let mut binding = fields(&[
        "id",
        "agent_id",
        "tool_name",
        "allow_usage_when_untrusted_data_is_present",
        "tool_result_treatment",
        "response_modifier_template",
        "credential_source_provider_id",
        "execution_source_provider_id",
        "use_dynamic_team_credential",
    ]);
    binding.insert(
        "policies",
        Array(Box::new(Struct(fields(&[
            "id",
            "argument_path",
            "operator",
            "value",
            "action",
            "reason",
        ])))),
    );

    Struct(HashMap::from([
        (
            "gateway",
            Struct(fields(&[
                "call_timeout_secs",
                "client_name",
                "builtin_tool_prefix",
            ])),
        ),
        (
            "http",
            Struct(fields(&["request_timeout_secs", "close_timeout_secs"])),
        ),
        (
            "attach",
            Struct(fields(&[
                "command",
                "extra_args",
                "default_namespace",
                "request_timeout_secs",
            ])),
        ),
        ("providers", Array(Box::new(Struct(provider)))),
        ("bindings", Array(Box::new(Struct(binding)))),
        (
            "dynamic_credentials",
            Array(Box::new(Struct(fields(&[
                "agent_id",
                "team_id",
                "provider_id",
            ])))),
        ),
    ]))
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|c| (*c, levenshtein(needle, c)))
        .filter(|(_, d)| *d > 0 && *d <= max_distance)
        .min_by_key(|(_, d)| *d)
        .map(|(c, _)| c)
}

/// Validate a config file, or the discovered one when `path` is `None`.
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => crate::loader::find_config_file(),
    };

    let Some(actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Info,
                "file-ref",
                "",
                "no config file found; using defaults",
            )],
            config_path: None,
        };
    };

    let mut result = match std::fs::read_to_string(&actual_path) {
        Ok(raw) => {
            let ext = actual_path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("toml");
            validate_str(&substitute_env(&raw), ext)
        },
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                format!("failed to read config file: {e}"),
            )],
            config_path: None,
        },
    };
    result.config_path = Some(actual_path);
    result
}

pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    validate_str(toml_str, "toml")
}

/// Validate raw config text in the format named by `ext`.
pub fn validate_str(raw: &str, ext: &str) -> ValidationResult {
    let mut diagnostics = Vec::new();

    // 1. Syntax
    let tree: Result<Value, String> = match ext {
        "toml" => toml::from_str::<toml::Value>(raw)
            .map_err(|e| format!("TOML syntax error: {e}"))
            .and_then(|v| serde_json::to_value(v).map_err(|e| e.to_string())),
        "yaml" | "yml" => {
            serde_yaml::from_str::<Value>(raw).map_err(|e| format!("YAML syntax error: {e}"))
        },
        "json" => serde_json::from_str::<Value>(raw).map_err(|e| format!("JSON syntax error: {e}")),
        other => Err(format!("unsupported config format: .{other}")),
    };
    let tree = match tree {
        Ok(tree) => tree,
        Err(message) => {
            diagnostics.push(Diagnostic::new(Severity::Error, "syntax", "", message));
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    // 2. Unknown fields
    check_unknown_fields(&tree, &build_schema_map(), "", &mut diagnostics);

    // 3. Types, then semantics on the parsed config
    match serde_json::from_value::<ToolgateConfig>(tree) {
        Ok(config) => check_semantics(&config, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic::new(
            Severity::Error,
            "type-error",
            "",
            format!("type error: {e}"),
        )),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn check_unknown_fields(
    value: &Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match (value, schema) {
        (Value::Object(table), KnownKeys::Struct(fields)) => {
            let known_keys: Vec<&str> = fields.keys().copied().collect();
            for (key, child) in table {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                if let Some(child_schema) = fields.get(key.as_str()) {
                    check_unknown_fields(child, child_schema, &path, diagnostics);
                    continue;
                }
                let level = if prefix.is_empty() {
                    " at top level"
                } else {
                    ""
                };
                let message = match suggest(key, &known_keys, 3) {
                    Some(s) => format!("unknown field{level} (did you mean \"{s}\"?)"),
                    None => format!("unknown field{level}"),
                };
                diagnostics.push(Diagnostic::new(
                    Severity::Error,
                    "unknown-field",
                    path,
                    message,
                ));
            }
        },
        (Value::Array(items), KnownKeys::Array(item_schema)) => {
            for (i, item) in items.iter().enumerate() {
                check_unknown_fields(item, item_schema, &format!("{prefix}[{i}]"), diagnostics);
            }
        },
        // Leaf or type mismatch; type errors are reported by deserialization.
        _ => {},
    }
}

fn check_semantics(config: &ToolgateConfig, diagnostics: &mut Vec<Diagnostic>) {
    use Severity::{Error, Warning};

    if config.gateway.call_timeout_secs == 0 {
        diagnostics.push(Diagnostic::new(
            Warning,
            "timeout",
            "gateway.call_timeout_secs",
            "a zero timeout fails every tool call immediately",
        ));
    }

    let mut provider_ids = HashSet::new();
    for (i, p) in config.providers.iter().enumerate() {
        let path = format!("providers[{i}]");
        if !provider_ids.insert(p.id.as_str()) {
            diagnostics.push(Diagnostic::new(
                Error,
                "duplicate-provider",
                format!("{path}.id"),
                format!("provider \"{}\" is defined more than once", p.id),
            ));
        }
        let speaks_http = p.to_provider().speaks_http();
        let has_endpoint = p
            .http_endpoint
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty());
        if speaks_http && !has_endpoint {
            diagnostics.push(Diagnostic::new(
                Error,
                "missing-endpoint",
                format!("{path}.http_endpoint"),
                format!("provider \"{}\" is reached over HTTP but has no http_endpoint", p.id),
            ));
        }
    }

    let check_provider_ref = |id: &str, path: String, diagnostics: &mut Vec<Diagnostic>| {
        if !provider_ids.contains(id) {
            diagnostics.push(Diagnostic::new(
                Error,
                "unknown-provider",
                path,
                format!("unknown provider \"{id}\""),
            ));
        }
    };

    let dynamic_agents: HashSet<&str> = config
        .dynamic_credentials
        .iter()
        .map(|d| d.agent_id.as_str())
        .collect();
    let mut seen = HashSet::new();

    for (i, b) in config.bindings.iter().enumerate() {
        let path = format!("bindings[{i}]");

        if !seen.insert((b.agent_id.as_str(), b.tool_name.as_str())) {
            diagnostics.push(Diagnostic::new(
                Error,
                "duplicate-binding",
                path.clone(),
                format!(
                    "tool \"{}\" is bound to agent \"{}\" more than once",
                    b.tool_name, b.agent_id
                ),
            ));
        }

        if split_tool_name(&b.tool_name).0.is_none() {
            diagnostics.push(Diagnostic::new(
                Error,
                "tool-name",
                format!("{path}.tool_name"),
                format!(
                    "tool name \"{}\" must be <server>__<tool>",
                    b.tool_name
                ),
            ));
        }

        if let Some(id) = &b.execution_source_provider_id {
            check_provider_ref(id, format!("{path}.execution_source_provider_id"), diagnostics);
        }
        if let Some(id) = &b.credential_source_provider_id {
            check_provider_ref(id, format!("{path}.credential_source_provider_id"), diagnostics);
        }

        let has_static_provider =
            b.execution_source_provider_id.is_some() || b.credential_source_provider_id.is_some();
        if b.use_dynamic_team_credential
            && !has_static_provider
            && !dynamic_agents.contains(b.agent_id.as_str())
        {
            diagnostics.push(Diagnostic::new(
                Warning,
                "dynamic-credential",
                format!("{path}.use_dynamic_team_credential"),
                format!(
                    "no dynamic_credentials entry for agent \"{}\"; calls will fail",
                    b.agent_id
                ),
            ));
        }
        if !has_static_provider && !b.use_dynamic_team_credential {
            diagnostics.push(Diagnostic::new(
                Warning,
                "no-provider",
                path.clone(),
                "binding has no execution or credential provider",
            ));
        }

        if let Some(template) = b.response_modifier_template.as_deref()
            && let Err(e) = handlebars::Template::compile(template)
        {
            diagnostics.push(Diagnostic::new(
                Warning,
                "template",
                format!("{path}.response_modifier_template"),
                format!("template does not compile, raw content will be returned: {e}"),
            ));
        }

        for (j, p) in b.policies.iter().enumerate() {
            if p.operator == PolicyOperator::Regex
                && let Err(e) = regex::Regex::new(&p.value)
            {
                diagnostics.push(Diagnostic::new(
                    Error,
                    "invalid-regex",
                    format!("{path}.policies[{j}].value"),
                    format!("invalid regex: {e}"),
                ));
            }
        }
    }

    for (i, d) in config.dynamic_credentials.iter().enumerate() {
        check_provider_ref(
            &d.provider_id,
            format!("dynamic_credentials[{i}].provider_id"),
            diagnostics,
        );
    }
}
