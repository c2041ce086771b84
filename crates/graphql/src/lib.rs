//! GraphQL resolution for Quire.
//!
//! A [`SchemaDescriptor`] declares the types; a [`Dispatcher`] binds a
//! resolver and a directive pipeline to every field and settles results,
//! including union discrimination. [`build_schema`] mounts both onto an
//! `async-graphql` dynamic schema, which parses, validates and walks
//! queries. Subscription fields stream from an [`EventChannel`] topic.
//!
//! Transport wiring is left to the host: HTTP handlers attach a
//! `RequestContext` to each request with [`request`], persistent
//! connections go through a [`ConnectionSession`].

pub mod context;
pub mod descriptor;
pub mod directives;
pub mod discriminate;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod library;
pub mod mutations;
pub mod queries;
pub mod scalars;
pub mod schema;
pub mod session;
pub mod subscriptions;
pub mod types;

pub use {
    descriptor::{SchemaDescriptor, SchemaDescriptorBuilder, TypeRef},
    directives::{Directive, DirectiveRegistry},
    dispatch::{Arguments, Dispatcher, DispatcherBuilder, FieldCall, Resolved, Resolver},
    error::SchemaError,
    events::EventChannel,
    library::Library,
    schema::{QuireSchema, build_schema, request},
    session::ConnectionSession,
};
