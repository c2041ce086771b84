use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{env_subst::substitute_env, schema::QuireConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["quire.toml", "quire.yaml", "quire.yml", "quire.json"];

/// Environment variable overriding `auth.policy`.
pub const ENV_AUTH_POLICY: &str = "QUIRE_AUTH_POLICY";
/// Environment variable overriding `auth.elevated_token`.
pub const ENV_ELEVATED_TOKEN: &str = "QUIRE_ELEVATED_TOKEN";

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<QuireConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations, then apply env overrides.
///
/// Search order:
/// 1. `./quire.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/quire/quire.{toml,yaml,yml,json}` (user-global)
///
/// Falls back to `QuireConfig::default()` if no file is found or it fails to
/// parse. The result is not validated; call [`crate::validate`] before use.
pub fn discover_and_load() -> QuireConfig {
    let config = match find_config_file() {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(&path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                QuireConfig::default()
            })
        },
        None => {
            debug!("no config file found, using defaults");
            QuireConfig::default()
        },
    };
    apply_env_overrides(config)
}

/// Apply `QUIRE_*` environment overrides on top of a loaded config.
pub fn apply_env_overrides(config: QuireConfig) -> QuireConfig {
    apply_env_overrides_with(config, |name| std::env::var(name).ok())
}

fn apply_env_overrides_with(
    mut config: QuireConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> QuireConfig {
    if let Some(raw) = lookup(ENV_AUTH_POLICY) {
        match raw.parse() {
            Ok(policy) => config.auth.policy = Some(policy),
            Err(e) => warn!(value = %raw, error = %e, "ignoring {ENV_AUTH_POLICY}"),
        }
    }
    if let Some(token) = lookup(ENV_ELEVATED_TOKEN) {
        config.auth.elevated_token = Secret::new(token);
    }
    config
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    // Project-local
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

/// Returns the user-global config directory (`~/.config/quire/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "quire").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<QuireConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
