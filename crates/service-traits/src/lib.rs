//! Collaborator interfaces consumed by the resolution core.
//!
//! The data store and the upload pipeline live outside the core; resolvers
//! only see the traits and types defined here. A `Noop` repository is
//! provided so a schema can be assembled before a real store is wired in.

use {
    async_trait::async_trait,
    futures::future::{BoxFuture, FutureExt},
    quire_common::ResolveError,
    serde::{Deserialize, Serialize},
    serde_json::Value,
    tracing::warn,
};

/// Error type returned by collaborator methods.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{message}")]
    Message { message: String },
    #[error("{0}")]
    Serde(#[from] serde_json::Error),
}

impl ServiceError {
    #[must_use]
    pub fn message(message: impl std::fmt::Display) -> Self {
        Self::Message {
            message: message.to_string(),
        }
    }
}

impl From<String> for ServiceError {
    fn from(value: String) -> Self {
        Self::message(value)
    }
}

impl From<&str> for ServiceError {
    fn from(value: &str) -> Self {
        Self::message(value)
    }
}

impl From<ServiceError> for ResolveError {
    fn from(err: ServiceError) -> Self {
        Self::other(err)
    }
}

pub type ServiceResult<T = Value> = Result<T, ServiceError>;

/// Collection names used by the library schema.
pub mod collections {
    pub const BOOKS: &str = "books";
    pub const AUTHORS: &str = "authors";
    pub const USERS: &str = "users";
    pub const POSTS: &str = "posts";
    pub const FILES: &str = "files";
}

// ── Repository ──────────────────────────────────────────────────────────────

/// Entity store holding records as JSON objects keyed by their `id` field.
///
/// Every lookup is treated by the core as an atomic, side-effect-free read;
/// implementations provide their own internal synchronization.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Look up a record by id. A miss is `Ok(None)`, never an error.
    async fn find_by_id(&self, collection: &str, id: &str) -> ServiceResult<Option<Value>>;

    /// All records of a collection, in insertion order.
    async fn list_all(&self, collection: &str) -> ServiceResult<Vec<Value>>;

    /// Append a record to a collection.
    async fn insert(&self, collection: &str, record: Value) -> ServiceResult<()>;
}

pub struct NoopRepository;

#[async_trait]
impl Repository for NoopRepository {
    async fn find_by_id(&self, _collection: &str, _id: &str) -> ServiceResult<Option<Value>> {
        Ok(None)
    }

    async fn list_all(&self, _collection: &str) -> ServiceResult<Vec<Value>> {
        Ok(Vec::new())
    }

    async fn insert(&self, collection: &str, _record: Value) -> ServiceResult<()> {
        warn!(collection, "insert on unconfigured repository");
        Err("repository not configured".into())
    }
}

// ── Uploads ─────────────────────────────────────────────────────────────────

/// Metadata of an uploaded file, passed through to clients unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileUpload {
    pub filename: String,
    pub mimetype: String,
    pub encoding: String,
}

/// A file-valued argument whose metadata settles later.
pub type PendingUpload = BoxFuture<'static, ServiceResult<FileUpload>>;

/// Wrap metadata that is already known into a [`PendingUpload`].
pub fn ready_upload(upload: FileUpload) -> PendingUpload {
    futures::future::ready(Ok(upload)).boxed()
}
