//! Request identity, capability accessors, and authorization checks.
//!
//! This crate provides:
//! - `IdentityResolver`: derives a `Principal` from header-like request metadata
//! - `AccessorFactory`: per-request model accessors scoped to that principal
//! - `ContextBuilder`/`RequestContext`: the immutable per-request context
//! - `guard`: resolver-local authorization checks

pub mod accessors;
pub mod context;
pub mod guard;
pub mod identity;
pub mod metadata;

pub use {
    accessors::{AccessorFactory, Accessors, UserModel},
    context::{ContextBuilder, RequestContext},
    guard::{require_authenticated, require_identity, require_principal},
    identity::{IdentityResolver, Principal},
    metadata::RequestMetadata,
    quire_config::AuthPolicy,
};
