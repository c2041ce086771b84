//! Mounting a [`SchemaDescriptor`] onto an executable `async-graphql`
//! dynamic schema.
//!
//! Every mounted field forwards to the [`Dispatcher`]; the engine only
//! parses, validates and walks the selection set. Object values travel
//! between fields as `serde_json::Value` parents.

use std::{collections::HashMap, sync::Arc};

use {
    async_graphql::{
        Request,
        dynamic::{
            self, Field, FieldFuture, FieldValue, InputValue, ResolverContext, SubscriptionField,
            SubscriptionFieldFuture,
        },
    },
    quire_auth::RequestContext,
    quire_common::ResolveError,
    quire_service_traits::{FileUpload, ready_upload},
    serde_json::{Map, Value},
    tokio_stream::StreamExt,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info},
};

use crate::{
    context::GqlContext,
    descriptor::{FieldDescriptor, ObjectDescriptor, SchemaDescriptor, TypeKind, TypeRef, UPLOAD},
    dispatch::{Arguments, Dispatcher, Resolved},
    error::{Context, SchemaError, gql_err},
    events::EventChannel,
    scalars::{enum_from_json, from_json, to_json},
};

/// The executable schema.
pub type QuireSchema = dynamic::Schema;

/// Content type reported for uploads that did not declare one.
const DEFAULT_MIMETYPE: &str = "application/octet-stream";
/// Transfer encoding reported for uploads.
const UPLOAD_ENCODING: &str = "7bit";

/// Build the executable schema for `dispatcher`'s descriptor.
///
/// Requests must carry a [`RequestContext`] in their data (see
/// [`request`]); subscription requests may also carry the
/// `CancellationToken` of their connection.
pub fn build_schema(
    dispatcher: Arc<Dispatcher>,
    events: EventChannel,
) -> Result<QuireSchema, SchemaError> {
    let descriptor = Arc::clone(dispatcher.schema());
    let subscription_root = descriptor.subscription_type();

    let mut builder = dynamic::Schema::build(
        descriptor.query_type(),
        descriptor.mutation_type(),
        subscription_root,
    );

    for object in descriptor.objects() {
        if Some(object.name.as_str()) == subscription_root {
            builder = builder.register(mount_subscription(object));
        } else {
            builder = builder.register(mount_object(object));
        }
    }
    for union in descriptor.unions() {
        let mounted = union
            .members
            .iter()
            .fold(dynamic::Union::new(union.name.as_str()), |u, member| {
                u.possible_type(member.as_str())
            });
        builder = builder.register(mounted);
    }
    for enumeration in descriptor.enums() {
        let mounted = enumeration
            .values
            .iter()
            .fold(dynamic::Enum::new(enumeration.name.as_str()), |e, value| {
                e.item(dynamic::EnumItem::new(value.as_str()))
            });
        builder = builder.register(mounted);
    }
    if descriptor.uses_uploads() {
        builder = builder.enable_uploading();
    }

    let schema = builder
        .data(Arc::new(GqlContext::new(dispatcher, events)))
        .finish()
        .context("dynamic schema rejected the declaration")?;
    info!(
        objects = descriptor.objects().len(),
        unions = descriptor.unions().len(),
        "schema mounted"
    );
    Ok(schema)
}

/// A request that resolves with `context`.
pub fn request(query: impl Into<Request>, context: RequestContext) -> Request {
    query.into().data(context)
}

// ── Objects ─────────────────────────────────────────────────────────────────

fn mount_object(object: &ObjectDescriptor) -> dynamic::Object {
    object
        .fields
        .iter()
        .fold(dynamic::Object::new(object.name.as_str()), |o, field| {
            o.field(mount_field(Arc::clone(field)))
        })
}

fn mount_field(field: Arc<FieldDescriptor>) -> Field {
    let ty = type_ref(&field.ty);
    let name = field.name.clone();
    let arguments = field.arguments.clone();
    let mounted = Field::new(name, ty, move |rctx| {
        let field = Arc::clone(&field);
        FieldFuture::new(async move {
            match resolve_field(&rctx, &field).await {
                Ok(value) => Ok(value),
                Err(err) if field.ty.is_non_null() => Err(err),
                Err(err) => {
                    // Nullable fields settle to null and keep their key in `data`.
                    let err = err.into_server_error(rctx.ctx.item.pos);
                    rctx.ctx.add_error(rctx.ctx.set_error_path(err));
                    Ok(None)
                },
            }
        })
    });
    arguments.into_iter().fold(mounted, |f, arg| {
        f.argument(InputValue::new(arg.name, type_ref(&arg.ty)))
    })
}

async fn resolve_field<'a>(
    rctx: &ResolverContext<'a>,
    field: &Arc<FieldDescriptor>,
) -> async_graphql::Result<Option<FieldValue<'a>>> {
    let gql = rctx.data::<Arc<GqlContext>>()?;
    let context = request_context(rctx)?;
    let parent = rctx
        .parent_value
        .downcast_ref::<Value>()
        .cloned()
        .unwrap_or(Value::Null);
    let args = collect_arguments(rctx, field)?;
    let resolved = gql
        .dispatcher
        .dispatch(field, parent, args, context)
        .await
        .map_err(gql_err)?;
    Ok(to_field_value(gql.dispatcher.schema(), &field.ty, resolved))
}

fn request_context<'a>(rctx: &'a ResolverContext<'_>) -> async_graphql::Result<&'a RequestContext> {
    rctx.data_opt::<RequestContext>()
        .ok_or_else(|| gql_err(ResolveError::unauthenticated("request has no context")))
}

fn collect_arguments(
    rctx: &ResolverContext<'_>,
    field: &FieldDescriptor,
) -> async_graphql::Result<Arguments> {
    let mut values = Map::new();
    let mut uploads = HashMap::new();
    for arg in &field.arguments {
        let Some(accessor) = rctx.args.get(&arg.name) else {
            continue;
        };
        if arg.ty.base_name() == UPLOAD {
            let upload = accessor.upload()?.value(rctx.ctx)?;
            debug!(argument = %arg.name, filename = %upload.filename, "upload received");
            uploads.insert(arg.name.clone(), FileUpload {
                filename: upload.filename,
                mimetype: upload
                    .content_type
                    .unwrap_or_else(|| DEFAULT_MIMETYPE.to_string()),
                encoding: UPLOAD_ENCODING.to_string(),
            });
        } else {
            values.insert(arg.name.clone(), to_json(accessor.as_value().clone())?);
        }
    }
    Ok(uploads
        .into_iter()
        .fold(Arguments::new(values), |args, (name, upload)| {
            args.with_upload(name, ready_upload(upload))
        }))
}

// ── Subscriptions ───────────────────────────────────────────────────────────

fn mount_subscription(object: &ObjectDescriptor) -> dynamic::Subscription {
    object
        .fields
        .iter()
        .fold(dynamic::Subscription::new(object.name.as_str()), |s, field| {
            s.field(mount_subscription_field(Arc::clone(field)))
        })
}

fn mount_subscription_field(field: Arc<FieldDescriptor>) -> SubscriptionField {
    let ty = type_ref(&field.ty);
    let name = field.name.clone();
    let arguments = field.arguments.clone();
    let mounted = SubscriptionField::new(name, ty, move |rctx| {
        let field = Arc::clone(&field);
        SubscriptionFieldFuture::new(async move {
            let gql = Arc::clone(rctx.data::<Arc<GqlContext>>()?);
            request_context(&rctx)?;
            let cancel = rctx
                .data_opt::<CancellationToken>()
                .cloned()
                .unwrap_or_else(CancellationToken::new);
            let events = gql.subscribe(field.topic(), cancel);
            Ok(events.map(move |payload| settle_event(&gql, &field, payload)))
        })
    });
    arguments.into_iter().fold(mounted, |f, arg| {
        f.argument(InputValue::new(arg.name, type_ref(&arg.ty)))
    })
}

fn settle_event<'a>(
    gql: &GqlContext,
    field: &FieldDescriptor,
    payload: Value,
) -> async_graphql::Result<FieldValue<'a>> {
    let settled = gql
        .dispatcher
        .settle(field, Resolved::from(payload))
        .map_err(gql_err)?;
    Ok(to_field_value(gql.dispatcher.schema(), &field.ty, settled).unwrap_or(FieldValue::NULL))
}

// ── Values ──────────────────────────────────────────────────────────────────

fn type_ref(ty: &TypeRef) -> dynamic::TypeRef {
    match ty {
        TypeRef::Named(name) => dynamic::TypeRef::named(name.clone()),
        TypeRef::NonNull(inner) => dynamic::TypeRef::NonNull(Box::new(type_ref(inner))),
        TypeRef::List(inner) => dynamic::TypeRef::List(Box::new(type_ref(inner))),
    }
}

/// Convert a settled value into what the engine expects for `ty`.
fn to_field_value<'a>(
    schema: &SchemaDescriptor,
    ty: &TypeRef,
    resolved: Resolved,
) -> Option<FieldValue<'a>> {
    match resolved {
        Resolved::Null => None,
        Resolved::List(items) => {
            let item_ty = ty.list_item().unwrap_or(ty);
            Some(FieldValue::list(items.into_iter().map(|item| {
                to_field_value(schema, item_ty, item).unwrap_or(FieldValue::NULL)
            })))
        },
        Resolved::Tagged { type_name, value } => {
            Some(FieldValue::owned_any(value).with_type(type_name))
        },
        Resolved::Value(value) => Some(match schema.kind_of(ty.base_name()) {
            Some(TypeKind::Object | TypeKind::Union) => FieldValue::owned_any(value),
            Some(TypeKind::Enum) => FieldValue::value(enum_from_json(&value)),
            Some(TypeKind::Scalar) | None => FieldValue::value(from_json(&value)),
        }),
    }
}
