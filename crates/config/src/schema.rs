/// Config schema types (auth policy, credentials, event channel).
use std::{fmt, str::FromStr};

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuireConfig {
    pub auth: AuthConfig,
    pub events: EventsConfig,
}

/// What happens when a request arrives without a resolvable identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthPolicy {
    /// Anonymous contexts are built; guarded resolvers reject them.
    Permissive,
    /// Context construction fails with `Unauthenticated`.
    Strict,
}

impl fmt::Display for AuthPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Permissive => write!(f, "permissive"),
            Self::Strict => write!(f, "strict"),
        }
    }
}

impl FromStr for AuthPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" => Ok(Self::Permissive),
            "strict" => Ok(Self::Strict),
            other => Err(format!("unknown auth policy: {other}")),
        }
    }
}

/// Identity resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Must be chosen per deployment; there is no implicit default.
    pub policy: Option<AuthPolicy>,
    /// Token value marking the elevated credential class. Any other token
    /// resolves to no identity.
    #[serde(serialize_with = "serialize_secret")]
    pub elevated_token: Secret<String>,
    /// Metadata key carrying the token.
    pub token_key: String,
    /// Metadata key carrying the subject id.
    pub subject_key: String,
    /// Subject ids admitted by privileged resolvers.
    pub privileged_subjects: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            policy: None,
            elevated_token: Secret::new("ADMIN".into()),
            token_key: "authentication".into(),
            subject_key: "uid".into(),
            privileged_subjects: vec!["1".into()],
        }
    }
}

impl AuthConfig {
    pub fn is_privileged(&self, subject: &str) -> bool {
        self.privileged_subjects.iter().any(|s| s == subject)
    }
}

/// Subscription event channel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Events a slow listener may fall behind before it starts skipping.
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self { capacity: 64 }
    }
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}
