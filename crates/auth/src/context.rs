use std::{fmt, sync::Arc};

use {
    quire_common::{ResolveError, Result},
    quire_config::{AuthConfig, AuthPolicy, ConfigError, QuireConfig, validate},
    quire_service_traits::Repository,
    tracing::{debug, info},
};

use crate::{
    accessors::{AccessorFactory, Accessors},
    identity::{IdentityResolver, Principal},
    metadata::RequestMetadata,
};

/// Immutable per-request state: who is calling and what they may reach.
///
/// Cloning is cheap and every clone refers to the same context, so all
/// operations on one persistent connection observe the same identity.
#[derive(Clone)]
pub struct RequestContext(Arc<Inner>);

struct Inner {
    identity: Option<Principal>,
    accessors: Accessors,
}

impl RequestContext {
    pub fn new(identity: Option<Principal>, accessors: Accessors) -> Self {
        Self(Arc::new(Inner {
            identity,
            accessors,
        }))
    }

    pub fn identity(&self) -> Option<&Principal> {
        self.0.identity.as_ref()
    }

    pub fn accessors(&self) -> &Accessors {
        &self.0.accessors
    }

    /// Whether both handles refer to the same context.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("identity", &self.0.identity.as_ref().map(|p| &p.id))
            .finish_non_exhaustive()
    }
}

/// Turns request metadata into a [`RequestContext`].
pub struct ContextBuilder {
    identity: IdentityResolver,
    accessors: AccessorFactory,
    policy: AuthPolicy,
}

impl ContextBuilder {
    pub fn new(identity: IdentityResolver, accessors: AccessorFactory, policy: AuthPolicy) -> Self {
        Self {
            identity,
            accessors,
            policy,
        }
    }

    /// Assemble a builder over one repository from validated auth settings.
    pub fn from_config(
        repo: Arc<dyn Repository>,
        config: &AuthConfig,
    ) -> std::result::Result<Self, ConfigError> {
        validate(&QuireConfig {
            auth: config.clone(),
            ..QuireConfig::default()
        })
        .into_result()?;
        let policy = config.policy.ok_or_else(|| ConfigError::Invalid {
            details: "auth.policy is not set".into(),
        })?;
        info!(%policy, "context builder ready");
        Ok(Self::new(
            IdentityResolver::new(Arc::clone(&repo), config),
            AccessorFactory::new(repo),
            policy,
        ))
    }

    pub fn policy(&self) -> AuthPolicy {
        self.policy
    }

    /// Build the context for one operation.
    ///
    /// When the operation belongs to a connection that already has a context,
    /// that context is returned unchanged and no identity lookup happens.
    pub async fn build(
        &self,
        metadata: &RequestMetadata,
        existing: Option<&RequestContext>,
    ) -> Result<RequestContext> {
        if let Some(existing) = existing {
            return Ok(existing.clone());
        }

        let identity = self.identity.resolve(metadata).await;
        if identity.is_none() && self.policy == AuthPolicy::Strict {
            return Err(ResolveError::unauthenticated("a valid identity is required"));
        }
        debug!(
            subject = identity.as_ref().map(|p| p.id.as_str()),
            "built request context"
        );
        let accessors = self.accessors.build(identity.as_ref());
        Ok(RequestContext::new(identity, accessors))
    }
}
