//! Configuration validation.
//!
//! Produces diagnostics for a loaded [`QuireConfig`]; any error-level
//! diagnostic makes the config unusable for building request contexts.

use std::fmt;

use {secrecy::ExposeSecret, thiserror::Error};

use crate::schema::{AuthPolicy, QuireConfig};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Warning => "warning",
        })
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "auth.policy"
    pub path: &'static str,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: {}", self.severity, self.path, self.message)
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
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

    /// Collapse error-level diagnostics into a [`ConfigError`].
    pub fn into_result(self) -> Result<(), ConfigError> {
        let errors: Vec<String> = self
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .map(ToString::to_string)
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid {
                details: errors.join("; "),
            })
        }
    }

    fn push(&mut self, severity: Severity, path: &'static str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path,
            message: message.into(),
        });
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {details}")]
    Invalid { details: String },
}

/// Validate a loaded configuration.
pub fn validate(config: &QuireConfig) -> ValidationResult {
    let mut result = ValidationResult::default();
    let auth = &config.auth;

    match auth.policy {
        None => result.push(
            Severity::Error,
            "auth.policy",
            "must be set to \"permissive\" or \"strict\"",
        ),
        Some(AuthPolicy::Permissive) if auth.privileged_subjects.is_empty() => result.push(
            Severity::Warning,
            "auth.privileged_subjects",
            "no subject can pass privileged resolvers",
        ),
        Some(_) => {},
    }

    if auth.elevated_token.expose_secret().trim().is_empty() {
        result.push(Severity::Error, "auth.elevated_token", "must not be empty");
    }

    for (path, key) in [
        ("auth.token_key", &auth.token_key),
        ("auth.subject_key", &auth.subject_key),
    ] {
        if !is_metadata_key(key) {
            result.push(
                Severity::Error,
                path,
                format!("{key:?} is not a valid metadata key"),
            );
        }
    }

    if auth.token_key.eq_ignore_ascii_case(&auth.subject_key) {
        result.push(
            Severity::Error,
            "auth.subject_key",
            "must differ from auth.token_key",
        );
    }

    if config.events.capacity == 0 {
        result.push(Severity::Error, "events.capacity", "must be greater than 0");
    }

    result
}

/// Header-like keys: non-empty ASCII tokens.
fn is_metadata_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, secrecy::Secret};

    fn valid() -> QuireConfig {
        let mut cfg = QuireConfig::default();
        cfg.auth.policy = Some(AuthPolicy::Strict);
        cfg
    }

    #[test]
    fn valid_config_has_no_diagnostics() {
        let result = validate(&valid());
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        assert!(result.into_result().is_ok());
    }

    #[test]
    fn missing_policy_is_an_error() {
        let result = validate(&QuireConfig::default());
        assert!(result.has_errors());
        let err = result.into_result().unwrap_err();
        assert!(err.to_string().contains("auth.policy"));
    }

    #[test]
    fn empty_token_and_bad_keys_are_errors() {
        let mut cfg = valid();
        cfg.auth.elevated_token = Secret::new("  ".into());
        cfg.auth.token_key = "has space".into();
        cfg.auth.subject_key = String::new();
        cfg.events.capacity = 0;
        let result = validate(&cfg);
        assert_eq!(result.count(Severity::Error), 4);
    }

    #[test]
    fn identical_keys_are_rejected() {
        let mut cfg = valid();
        cfg.auth.subject_key = "Authentication".into();
        assert!(validate(&cfg).has_errors());
    }

    #[test]
    fn permissive_without_privileged_subjects_warns() {
        let mut cfg = valid();
        cfg.auth.policy = Some(AuthPolicy::Permissive);
        cfg.auth.privileged_subjects.clear();
        let result = validate(&cfg);
        assert!(!result.has_errors());
        assert_eq!(result.count(Severity::Warning), 1);
    }
}
