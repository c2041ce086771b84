//! Per-request data accessors.
//!
//! Accessors are built once per request and capture that request's identity,
//! so every data call checks the caller without resolvers having to remember
//! to.

use std::sync::Arc;

use {
    quire_common::Result,
    quire_service_traits::{Repository, collections},
    serde_json::Value,
    tracing::debug,
};

use crate::{guard::require_principal, identity::Principal};

/// Builds [`Accessors`] bound to a request's identity.
#[derive(Clone)]
pub struct AccessorFactory {
    repo: Arc<dyn Repository>,
}

impl AccessorFactory {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    pub fn build(&self, identity: Option<&Principal>) -> Accessors {
        Accessors {
            users: UserModel {
                repo: Arc::clone(&self.repo),
                identity: identity.cloned(),
            },
        }
    }
}

/// The accessor set handed to resolvers through the request context.
#[derive(Clone)]
pub struct Accessors {
    pub users: UserModel,
}

/// User lookups; every call requires an authenticated principal.
#[derive(Clone)]
pub struct UserModel {
    repo: Arc<dyn Repository>,
    identity: Option<Principal>,
}

impl UserModel {
    fn check(&self) -> Result<()> {
        require_principal(self.identity.as_ref(), |_| true).map(|_| ())
    }

    pub async fn get_all(&self) -> Result<Vec<Value>> {
        self.check()?;
        Ok(self.repo.list_all(collections::USERS).await?)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<Value>> {
        self.check()?;
        debug!(id, "user lookup");
        Ok(self.repo.find_by_id(collections::USERS, id).await?)
    }

    pub async fn get_by_group_id(&self, group_id: &str) -> Result<Vec<Value>> {
        self.check()?;
        let users = self.repo.list_all(collections::USERS).await?;
        Ok(users
            .into_iter()
            .filter(|u| u.get("groupId").and_then(Value::as_str) == Some(group_id))
            .collect())
    }
}
