//! Configuration loading, env substitution, overrides, and validation.
//!
//! Config files: `quire.toml`, `quire.yaml`, or `quire.json`
//! Searched in `./` then `~/.config/quire/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-default}` substitution in all string
//! values.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{apply_env_overrides, config_dir, discover_and_load, load_config},
    schema::{AuthConfig, AuthPolicy, EventsConfig, QuireConfig},
    validate::{ConfigError, Diagnostic, Severity, ValidationResult, validate},
};
