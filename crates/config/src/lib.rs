//! Configuration loading, validation, and env substitution.
//!
//! Config files: `toolgate.toml`, `toolgate.yaml`, or `toolgate.json`
//! Searched in `./` then `~/.config/toolgate/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-fallback}` substitution.

pub mod catalog;
pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    catalog::build_catalog,
    loader::{config_dir, discover_and_load, find_config_file, load_config, load_or_discover},
    schema::{
        AttachConfig, AttachTargetConfig, BindingConfig, DynamicCredentialConfig, GatewayConfig,
        HttpConfig, PolicyConfig, ProviderConfig, ToolgateConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult, validate, validate_str, validate_toml_str},
};
