use std::sync::Arc;

use {
    quire_config::AuthConfig,
    quire_service_traits::{Repository, collections},
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    serde_json::Value,
    tracing::{debug, warn},
};

use crate::metadata::RequestMetadata;

/// The authenticated party a request acts on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Principal {
    /// Read a principal from a stored user record.
    ///
    /// Records without a string `id` or `name` are not principals.
    pub fn from_record(record: &Value) -> Option<Self> {
        let id = match record.get("id")? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let display_name = record.get("name")?.as_str()?.to_string();
        let text = |key: &str| record.get(key).and_then(Value::as_str).map(str::to_string);
        Some(Self {
            id,
            display_name,
            phone: text("phone"),
            email: text("email"),
        })
    }

    /// The principal as a `User`-shaped record.
    pub fn to_record(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Derives a [`Principal`] from request metadata.
///
/// Only the elevated credential class maps to an identity. Its subject id is
/// looked up in the user collection; any other token, an absent subject, an
/// unknown subject, or a store failure all yield no identity.
pub struct IdentityResolver {
    users: Arc<dyn Repository>,
    elevated_token: Secret<String>,
    token_key: String,
    subject_key: String,
}

impl IdentityResolver {
    pub fn new(users: Arc<dyn Repository>, config: &AuthConfig) -> Self {
        Self {
            users,
            elevated_token: config.elevated_token.clone(),
            token_key: config.token_key.clone(),
            subject_key: config.subject_key.clone(),
        }
    }

    pub async fn resolve(&self, metadata: &RequestMetadata) -> Option<Principal> {
        let token = metadata.get(&self.token_key)?;
        if !constant_time_eq(token, self.elevated_token.expose_secret()) {
            debug!("token is not elevated, no identity");
            return None;
        }

        let subject = metadata.get(&self.subject_key)?;
        match self.users.find_by_id(collections::USERS, subject).await {
            Ok(Some(record)) => {
                let principal = Principal::from_record(&record);
                if principal.is_none() {
                    warn!(subject, "user record is missing id or name");
                }
                principal
            },
            Ok(None) => {
                debug!(subject, "no user for subject");
                None
            },
            Err(e) => {
                warn!(subject, error = %e, "identity lookup failed");
                None
            },
        }
    }
}

/// Compare without exiting at the first differing byte.
fn constant_time_eq(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a.bytes()
            .zip(b.bytes())
            .fold(0, |acc, (x, y)| acc | (x ^ y))
            == 0
}
