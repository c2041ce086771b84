//! The library API: books, authors, users, uploaded files and posts.
//!
//! [`Library`] is the composition root's handle on the repository and event
//! channel. Resolvers get a clone of it, so it only holds shared handles.

use std::sync::Arc;

use {
    quire_config::AuthConfig,
    quire_service_traits::Repository,
    tracing::info,
};

use crate::{
    dispatch::{Dispatcher, DispatcherBuilder, FieldCall, Resolved},
    error::SchemaError,
    events::EventChannel,
    mutations, queries,
    schema::{QuireSchema, build_schema},
    types::library_schema,
};

#[derive(Clone)]
pub struct Library {
    repo: Arc<dyn Repository>,
    events: EventChannel,
    privileged_subjects: Arc<[String]>,
}

impl Library {
    pub fn new(repo: Arc<dyn Repository>, events: EventChannel, config: &AuthConfig) -> Self {
        Self {
            repo,
            events,
            privileged_subjects: config.privileged_subjects.clone().into(),
        }
    }

    pub fn repo(&self) -> &dyn Repository {
        self.repo.as_ref()
    }

    pub fn events(&self) -> &EventChannel {
        &self.events
    }

    /// Whether `subject` may read single books.
    pub fn is_privileged(&self, subject: &str) -> bool {
        self.privileged_subjects.iter().any(|s| s == subject)
    }

    /// Declare the schema and bind every resolver.
    pub fn dispatcher(&self) -> Result<Dispatcher, SchemaError> {
        let mut builder = DispatcherBuilder::new(Arc::new(library_schema()?));
        queries::register(&mut builder, self)?;
        mutations::register(&mut builder, self)?;
        builder.build()
    }

    /// The executable library schema.
    pub fn schema(&self) -> Result<QuireSchema, SchemaError> {
        let dispatcher = Arc::new(self.dispatcher()?);
        let schema = build_schema(dispatcher, self.events.clone())?;
        info!(
            privileged = self.privileged_subjects.len(),
            "library schema ready"
        );
        Ok(schema)
    }
}

/// Bind `resolver` to `type_name.field`, handing it a clone of `library`.
pub(crate) fn bind<F, Fut>(
    builder: &mut DispatcherBuilder,
    library: &Library,
    type_name: &str,
    field: &str,
    resolver: F,
) -> Result<(), SchemaError>
where
    F: Fn(Library, FieldCall) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = quire_common::Result<Resolved>> + Send + 'static,
{
    let library = library.clone();
    builder.resolve_with(type_name, field, move |call| resolver(library.clone(), call))?;
    Ok(())
}
