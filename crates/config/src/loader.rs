use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::ToolgateConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "toolgate.toml",
    "toolgate.yaml",
    "toolgate.yml",
    "toolgate.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<ToolgateConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./toolgate.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/toolgate/toolgate.{toml,yaml,yml,json}` (user-global)
///
/// Returns `ToolgateConfig::default()` if no config file is found or it
/// fails to load.
pub fn discover_and_load() -> ToolgateConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    ToolgateConfig::default()
}

/// Load `path` when given, otherwise discover. An explicit path must load.
pub fn load_or_discover(path: Option<&Path>) -> anyhow::Result<ToolgateConfig> {
    match path {
        Some(path) => load_config(path),
        None => Ok(discover_and_load()),
    }
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/toolgate/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "toolgate").map(|d| d.config_dir().to_path_buf())
}

pub(crate) fn parse_config(raw: &str, path: &Path) -> anyhow::Result<ToolgateConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use {super::*, std::io::Write};

    fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "toolgate.toml",
            "[gateway]\ncall_timeout_secs = 5\n\n[[providers]]\nid = \"p1\"\n",
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.gateway.call_timeout_secs, 5);
        assert_eq!(cfg.providers[0].id, "p1");
    }

    #[test]
    fn loads_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = write(
            &dir,
            "toolgate.yaml",
            "bindings:\n  - agent_id: a\n    tool_name: gh__list\n",
        );
        assert_eq!(load_config(&yaml).unwrap().bindings[0].tool_name, "gh__list");

        let json = write(
            &dir,
            "toolgate.json",
            r#"{"attach": {"default_namespace": "mcp"}}"#,
        );
        assert_eq!(load_config(&json).unwrap().attach.default_namespace, "mcp");
    }

    #[test]
    fn unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "toolgate.ini", "");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_or_discover(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
