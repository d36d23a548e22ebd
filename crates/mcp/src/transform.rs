//! Response reshaping through administrator-authored templates.
//!
//! The transformer never fails: a template that does not compile or render
//! leaves the provider content untouched.

use std::sync::Arc;

use {
    handlebars::{Handlebars, handlebars_helper},
    serde_json::{Value, json},
    tracing::{debug, warn},
};

#[cfg(feature = "metrics")]
use toolgate_metrics::{counter, gateway as gateway_metrics};

use crate::types::text_content;

#[derive(Debug, thiserror::Error)]
#[error("template rendering failed: {0}")]
pub struct TemplateError(pub String);

/// Narrow rendering capability the transformer depends on.
pub trait TemplateEngine: Send + Sync {
    fn render(&self, template: &str, context: &Value) -> Result<String, TemplateError>;
}

/// JSON-escape `value` for embedding inside a JSON string literal.
pub fn escape_json(value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let quoted = Value::String(text).to_string();
    quoted[1..quoted.len() - 1].to_string()
}

handlebars_helper!(json_helper: |value: Json| value.to_string());
handlebars_helper!(escape_json_helper: |value: Json| escape_json(value));
handlebars_helper!(parse_json_helper: |text: str| {
    serde_json::from_str::<Value>(text).unwrap_or(Value::Null)
});

/// Handlebars-backed engine with the `json`, `escapeJson` and `parseJson` helpers.
///
/// `lookup`, `each`, `if`, `with` and `{{{raw}}}` interpolation are built in.
/// HTML escaping is off, so `{{x}}` and `{{{x}}}` render the same text.
pub struct HandlebarsEngine {
    registry: Handlebars<'static>,
}

impl Default for HandlebarsEngine {
    fn default() -> Self {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        // Output is JSON or plain text, never HTML.
        registry.register_escape_fn(handlebars::no_escape);
        registry.register_helper("json", Box::new(json_helper));
        registry.register_helper("escapeJson", Box::new(escape_json_helper));
        registry.register_helper("parseJson", Box::new(parse_json_helper));
        Self { registry }
    }
}

impl TemplateEngine for HandlebarsEngine {
    fn render(&self, template: &str, context: &Value) -> Result<String, TemplateError> {
        self.registry
            .render_template(template, context)
            .map_err(|e| TemplateError(e.to_string()))
    }
}

/// Applies per-binding response templates to provider content.
#[derive(Clone)]
pub struct ResponseTransformer {
    engine: Arc<dyn TemplateEngine>,
}

impl Default for ResponseTransformer {
    fn default() -> Self {
        Self::new(Arc::new(HandlebarsEngine::default()))
    }
}

impl ResponseTransformer {
    pub fn new(engine: Arc<dyn TemplateEngine>) -> Self {
        Self { engine }
    }

    /// Render `template` over `{ "response": raw_content }`.
    ///
    /// Output that parses as JSON becomes the new content; any other output
    /// is wrapped in a single text item. Without a template, or when
    /// rendering fails, `raw_content` is returned unchanged.
    pub fn transform(&self, raw_content: &Value, template: Option<&str>) -> Value {
        let Some(template) = template else {
            return raw_content.clone();
        };

        let context = json!({ "response": raw_content });
        match self.engine.render(template, &context) {
            Ok(rendered) => match serde_json::from_str::<Value>(&rendered) {
                Ok(parsed) => parsed,
                Err(_) => {
                    debug!("response template produced non-JSON output, wrapping as text");
                    Value::Array(vec![text_content(rendered)])
                },
            },
            Err(e) => {
                warn!(error = %e, "response template failed, returning original content");
                #[cfg(feature = "metrics")]
                counter!(gateway_metrics::TEMPLATE_FALLBACKS_TOTAL).increment(1);
                raw_content.clone()
            },
        }
    }
}
