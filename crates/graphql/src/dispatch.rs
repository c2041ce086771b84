//! Field resolver dispatch.
//!
//! The dispatcher owns the resolver bound to every declared field and the
//! directive pipeline instantiated for it. A dispatch runs one field's chain
//! to completion: resolver, settlement, directives, then union
//! discrimination for union-typed fields.

use std::{collections::HashMap, fmt, sync::Arc};

use {
    async_trait::async_trait,
    quire_auth::RequestContext,
    quire_common::{ResolveError, Result},
    quire_service_traits::PendingUpload,
    serde_json::{Map, Value},
    tracing::{Instrument, debug, debug_span},
};

use crate::{
    descriptor::{FieldDescriptor, SchemaDescriptor, TypeKind},
    directives::{DirectivePipeline, DirectiveRegistry},
    discriminate::{check_tag, discriminate},
    error::SchemaError,
};

// ── Resolved values ─────────────────────────────────────────────────────────

/// A settled field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Null,
    Value(Value),
    List(Vec<Resolved>),
    /// A union variant whose concrete type the resolver states explicitly.
    Tagged { type_name: String, value: Value },
}

impl Resolved {
    pub fn tagged(type_name: impl Into<String>, value: Value) -> Self {
        Self::Tagged {
            type_name: type_name.into(),
            value,
        }
    }

    pub fn list(values: impl IntoIterator<Item = Value>) -> Self {
        Self::List(values.into_iter().map(Self::from).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<Value> for Resolved {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Array(items) => Self::list(items),
            other => Self::Value(other),
        }
    }
}

impl From<Option<Value>> for Resolved {
    fn from(value: Option<Value>) -> Self {
        value.map_or(Self::Null, Self::from)
    }
}

// ── Resolver calls ──────────────────────────────────────────────────────────

/// Argument values of one field invocation.
#[derive(Default)]
pub struct Arguments {
    values: Map<String, Value>,
    uploads: HashMap<String, PendingUpload>,
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arguments")
            .field("values", &self.values)
            .field("uploads", &self.uploads.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Arguments {
    pub fn new(values: Map<String, Value>) -> Self {
        Self {
            values,
            uploads: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_upload(mut self, name: impl Into<String>, upload: PendingUpload) -> Self {
        self.uploads.insert(name.into(), upload);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).filter(|v| !v.is_null())
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Take ownership of a pending upload argument.
    pub fn take_upload(&mut self, name: &str) -> Option<PendingUpload> {
        self.uploads.remove(name)
    }

    /// Names of all supplied arguments, uploads included, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .values
            .keys()
            .chain(self.uploads.keys())
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }
}

/// Everything a resolver receives for one field invocation.
#[derive(Debug)]
pub struct FieldCall {
    pub field: Arc<FieldDescriptor>,
    pub parent: Value,
    pub args: Arguments,
    pub context: RequestContext,
}

#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, call: FieldCall) -> Result<Resolved>;
}

struct FnResolver<F>(F);

#[async_trait]
impl<F, Fut> Resolver for FnResolver<F>
where
    F: Fn(FieldCall) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Resolved>> + Send + 'static,
{
    async fn resolve(&self, call: FieldCall) -> Result<Resolved> {
        (self.0)(call).await
    }
}

/// Adapt an async closure into a [`Resolver`].
pub fn resolver_fn<F, Fut>(f: F) -> Arc<dyn Resolver>
where
    F: Fn(FieldCall) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Resolved>> + Send + 'static,
{
    Arc::new(FnResolver(f))
}

/// Reads `parent[field]`; used for fields without a bound resolver.
struct PropertyResolver;

#[async_trait]
impl Resolver for PropertyResolver {
    async fn resolve(&self, call: FieldCall) -> Result<Resolved> {
        let FieldCall { field, parent, .. } = call;
        Ok(match parent {
            Value::Object(mut map) => Resolved::from(map.remove(&field.name)),
            _ => Resolved::Null,
        })
    }
}

// ── Dispatcher ──────────────────────────────────────────────────────────────

pub struct DispatcherBuilder {
    schema: Arc<SchemaDescriptor>,
    directives: DirectiveRegistry,
    resolvers: HashMap<String, HashMap<String, Arc<dyn Resolver>>>,
}

impl DispatcherBuilder {
    pub fn new(schema: Arc<SchemaDescriptor>) -> Self {
        Self {
            schema,
            directives: DirectiveRegistry::with_builtins(),
            resolvers: HashMap::new(),
        }
    }

    #[must_use]
    pub fn directives(mut self, registry: DirectiveRegistry) -> Self {
        self.directives = registry;
        self
    }

    pub fn schema(&self) -> &Arc<SchemaDescriptor> {
        &self.schema
    }

    /// Bind a resolver to a declared field.
    pub fn register(
        &mut self,
        type_name: &str,
        field: &str,
        resolver: Arc<dyn Resolver>,
    ) -> std::result::Result<&mut Self, SchemaError> {
        if self.schema.field(type_name, field).is_none() {
            return Err(SchemaError::UnknownField {
                type_name: type_name.to_string(),
                field: field.to_string(),
            });
        }
        let bound = self.resolvers.entry(type_name.to_string()).or_default();
        if bound.contains_key(field) {
            return Err(SchemaError::DuplicateResolver {
                type_name: type_name.to_string(),
                field: field.to_string(),
            });
        }
        bound.insert(field.to_string(), resolver);
        Ok(self)
    }

    /// [`register`](Self::register) for an async closure.
    pub fn resolve_with<F, Fut>(
        &mut self,
        type_name: &str,
        field: &str,
        f: F,
    ) -> std::result::Result<&mut Self, SchemaError>
    where
        F: Fn(FieldCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Resolved>> + Send + 'static,
    {
        self.register(type_name, field, resolver_fn(f))
    }

    /// Instantiate every field's directive pipeline and freeze the bindings.
    pub fn build(mut self) -> std::result::Result<Dispatcher, SchemaError> {
        let fallback: Arc<dyn Resolver> = Arc::new(PropertyResolver);
        let mut bindings: HashMap<String, HashMap<String, Binding>> = HashMap::new();
        for object in self.schema.objects() {
            let mut bound = self.resolvers.remove(&object.name).unwrap_or_default();
            let fields = bindings.entry(object.name.clone()).or_default();
            for field in &object.fields {
                let directives = self.directives.instantiate(field)?;
                let resolver = bound
                    .remove(&field.name)
                    .unwrap_or_else(|| Arc::clone(&fallback));
                fields.insert(field.name.clone(), Binding {
                    resolver,
                    directives,
                });
            }
        }
        debug!(types = bindings.len(), "dispatcher built");
        Ok(Dispatcher {
            schema: self.schema,
            bindings,
        })
    }
}

struct Binding {
    resolver: Arc<dyn Resolver>,
    directives: DirectivePipeline,
}

pub struct Dispatcher {
    schema: Arc<SchemaDescriptor>,
    bindings: HashMap<String, HashMap<String, Binding>>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("types", &self.bindings.len())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn builder(schema: Arc<SchemaDescriptor>) -> DispatcherBuilder {
        DispatcherBuilder::new(schema)
    }

    pub fn schema(&self) -> &Arc<SchemaDescriptor> {
        &self.schema
    }

    fn binding(&self, field: &FieldDescriptor) -> Result<&Binding> {
        self.bindings
            .get(&field.parent_type)
            .and_then(|fields| fields.get(&field.name))
            .ok_or_else(|| {
                ResolveError::resolver(format!("field {} is not declared", field.coordinate()))
            })
    }

    /// Resolve one field of `parent`.
    ///
    /// Resolver failures are returned unchanged; sibling fields are not
    /// affected by them.
    pub async fn dispatch(
        &self,
        field: &Arc<FieldDescriptor>,
        parent: Value,
        args: Arguments,
        context: &RequestContext,
    ) -> Result<Resolved> {
        let span = debug_span!(
            "resolve",
            parent_type = %field.parent_type,
            field = %field.name
        );
        async move {
            let binding = self.binding(field)?;
            let call = FieldCall {
                field: Arc::clone(field),
                parent,
                args,
                context: context.clone(),
            };
            let settled = binding.resolver.resolve(call).await.inspect_err(|e| {
                debug!(code = e.code(), error = %e, "resolver failed");
            })?;
            self.finish(field, binding, settled)
        }
        .instrument(span)
        .await
    }

    /// Run a settled value through the field's directives and, for union
    /// fields, discrimination. Used for values that arrive without a
    /// resolver call, such as subscription events.
    pub fn settle(&self, field: &FieldDescriptor, value: Resolved) -> Result<Resolved> {
        let binding = self.binding(field)?;
        self.finish(field, binding, value)
    }

    fn finish(&self, field: &FieldDescriptor, binding: &Binding, value: Resolved) -> Result<Resolved> {
        let value = binding.directives.apply(value);
        let union_name = field.ty.base_name();
        if self.schema.kind_of(union_name) != Some(TypeKind::Union) {
            return Ok(value);
        }
        self.discriminate_all(union_name, value)
    }

    fn discriminate_all(&self, union_name: &str, value: Resolved) -> Result<Resolved> {
        let union = self.schema.union(union_name).ok_or_else(|| {
            ResolveError::unresolved_type(union_name, "union is not declared")
        })?;
        match value {
            Resolved::Null => Ok(Resolved::Null),
            Resolved::List(items) => items
                .into_iter()
                .map(|item| self.discriminate_all(union_name, item))
                .collect::<Result<Vec<_>>>()
                .map(Resolved::List),
            Resolved::Tagged { type_name, value } => {
                check_tag(union, &type_name)?;
                Ok(Resolved::Tagged { type_name, value })
            },
            Resolved::Value(value) => {
                let type_name = discriminate(&self.schema, union, &value)?;
                debug!(union = %union.name, member = type_name, "discriminated");
                Ok(Resolved::tagged(type_name, value))
            },
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use {
        super::*,
        quire_auth::AccessorFactory,
        quire_service_traits::NoopRepository,
        serde_json::json,
    };

    fn schema() -> Arc<SchemaDescriptor> {
        Arc::new(
            SchemaDescriptor::builder()
                .object("Query", |o| {
                    o.field("book", "Book")
                        .field("search", "[Result]")
                        .field("first", "Result")
                        .field_with("motto", "String", |f| f.directive("upper"))
                })
                .object("Book", |o| {
                    o.field_with("title", "String", |f| f.directive("upper"))
                        .field("id", "String")
                        .shape(["title"])
                })
                .object("Author", |o| o.field("name", "String!").field("id", "String"))
                .union("Result", ["Book", "Author"])
                .query("Query")
                .build()
                .unwrap(),
        )
    }

    fn anonymous() -> RequestContext {
        let accessors = AccessorFactory::new(Arc::new(NoopRepository)).build(None);
        RequestContext::new(None, accessors)
    }

    fn field(schema: &SchemaDescriptor, t: &str, f: &str) -> Arc<FieldDescriptor> {
        Arc::clone(schema.field(t, f).unwrap())
    }

    #[tokio::test]
    async fn unbound_fields_read_the_parent_property() {
        let schema = schema();
        let dispatcher = Dispatcher::builder(Arc::clone(&schema)).build().unwrap();
        let title = field(&schema, "Book", "title");
        let out = dispatcher
            .dispatch(&title, json!({"title": "Thank you Lord!"}), Arguments::default(), &anonymous())
            .await
            .unwrap();
        assert_eq!(out, Resolved::Value(json!("THANK YOU LORD!")));

        let missing = dispatcher
            .dispatch(&title, json!({}), Arguments::default(), &anonymous())
            .await
            .unwrap();
        assert!(missing.is_null());
    }

    #[tokio::test]
    async fn bound_resolver_output_goes_through_directives() {
        let schema = schema();
        let mut builder = Dispatcher::builder(Arc::clone(&schema));
        builder
            .resolve_with("Query", "motto", |_call| async { Ok(Resolved::from(json!("keep going"))) })
            .unwrap();
        let dispatcher = builder.build().unwrap();
        let out = dispatcher
            .dispatch(&field(&schema, "Query", "motto"), Value::Null, Arguments::default(), &anonymous())
            .await
            .unwrap();
        assert_eq!(out, Resolved::Value(json!("KEEP GOING")));
    }

    #[tokio::test]
    async fn typed_failures_propagate_unchanged() {
        let schema = schema();
        let mut builder = Dispatcher::builder(Arc::clone(&schema));
        builder
            .resolve_with("Query", "book", |_call| async {
                Err(ResolveError::forbidden("Authorization Error"))
            })
            .unwrap();
        let dispatcher = builder.build().unwrap();
        let err = dispatcher
            .dispatch(&field(&schema, "Query", "book"), Value::Null, Arguments::default(), &anonymous())
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Authorization { ref message } if message == "Authorization Error"));
    }

    #[tokio::test]
    async fn union_lists_are_discriminated_per_item() {
        let schema = schema();
        let mut builder = Dispatcher::builder(Arc::clone(&schema));
        builder
            .resolve_with("Query", "search", |_call| async {
                Ok(Resolved::List(vec![
                    Resolved::from(json!({"id": "1", "title": "Thank you Lord!"})),
                    Resolved::tagged("Author", json!({"id": "1", "name": "Zlantan Otayo"})),
                    Resolved::from(json!({"id": "2", "name": "Beyounce Qhyo"})),
                    Resolved::Null,
                ]))
            })
            .unwrap();
        let dispatcher = builder.build().unwrap();
        let out = dispatcher
            .dispatch(&field(&schema, "Query", "search"), Value::Null, Arguments::default(), &anonymous())
            .await
            .unwrap();
        let Resolved::List(items) = out else {
            panic!("expected list, got {out:?}");
        };
        let tags: Vec<_> = items
            .iter()
            .map(|i| match i {
                Resolved::Tagged { type_name, .. } => type_name.as_str(),
                _ => "null",
            })
            .collect();
        assert_eq!(tags, ["Book", "Author", "Author", "null"]);
    }

    #[tokio::test]
    async fn undiscriminable_union_values_fail() {
        let schema = schema();
        let mut builder = Dispatcher::builder(Arc::clone(&schema));
        builder
            .resolve_with("Query", "first", |_call| async { Ok(Resolved::from(json!({"id": "9"}))) })
            .unwrap();
        let dispatcher = builder.build().unwrap();
        let err = dispatcher
            .dispatch(&field(&schema, "Query", "first"), Value::Null, Arguments::default(), &anonymous())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UNRESOLVED_TYPE");

        let bad_tag = dispatcher.settle(
            &field(&schema, "Query", "first"),
            Resolved::tagged("Shelf", json!({})),
        );
        assert!(matches!(bad_tag, Err(ResolveError::AmbiguousOrUnknownType { .. })));
    }

    #[tokio::test]
    async fn resolver_sees_parent_arguments_and_context() {
        let schema = schema();
        let seen = Arc::new(AtomicUsize::new(0));
        let mut builder = Dispatcher::builder(Arc::clone(&schema));
        let counter = Arc::clone(&seen);
        builder
            .resolve_with("Book", "id", move |call| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    assert_eq!(call.parent["title"], "x");
                    assert_eq!(call.args.str("suffix"), Some("-a"));
                    assert!(call.context.identity().is_none());
                    assert_eq!(call.field.name, "id");
                    Ok(Resolved::from(json!(format!("7{}", call.args.str("suffix").unwrap_or("")))))
                }
            })
            .unwrap();
        let dispatcher = builder.build().unwrap();
        let args = Arguments::new(json!({"suffix": "-a"}).as_object().cloned().unwrap());
        let out = dispatcher
            .dispatch(&field(&schema, "Book", "id"), json!({"title": "x"}), args, &anonymous())
            .await
            .unwrap();
        assert_eq!(out, Resolved::Value(json!("7-a")));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn registration_errors() {
        let schema = schema();
        let mut builder = Dispatcher::builder(Arc::clone(&schema));
        let err = builder
            .resolve_with("Query", "nope", |_call| async { Ok(Resolved::Null) })
            .err()
            .unwrap();
        assert!(matches!(err, SchemaError::UnknownField { .. }));

        builder
            .resolve_with("Query", "book", |_call| async { Ok(Resolved::Null) })
            .unwrap();
        let err = builder
            .resolve_with("Query", "book", |_call| async { Ok(Resolved::Null) })
            .err()
            .unwrap();
        assert!(matches!(err, SchemaError::DuplicateResolver { .. }));
    }

    #[test]
    fn unknown_directives_fail_the_build() {
        let schema = Arc::new(
            SchemaDescriptor::builder()
                .object("Query", |o| o.field_with("x", "String", |f| f.directive("shout")))
                .query("Query")
                .build()
                .unwrap(),
        );
        assert!(Dispatcher::builder(schema).build().is_err());
    }

    #[test]
    fn arguments_list_upload_names_too() {
        let mut args = Arguments::new(json!({"input": "x", "other": null}).as_object().cloned().unwrap())
            .with_upload(
                "file",
                quire_service_traits::ready_upload(quire_service_traits::FileUpload {
                    filename: "a.txt".into(),
                    mimetype: "text/plain".into(),
                    encoding: "7bit".into(),
                }),
            );
        assert_eq!(args.names(), ["file", "input", "other"]);
        assert_eq!(args.get("other"), None);
        assert!(args.take_upload("file").is_some());
        assert!(args.take_upload("file").is_none());
    }
}
