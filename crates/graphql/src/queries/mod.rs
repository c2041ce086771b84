//! Query resolvers of the library schema, plus the nested `authors` fields.

use {
    quire_auth::{Principal, require_identity},
    quire_common::{ResolveError, Result},
    quire_service_traits::collections::{AUTHORS, BOOKS, FILES, POSTS},
    serde_json::Value,
    tracing::debug,
};

use crate::{
    dispatch::{DispatcherBuilder, FieldCall, Resolved},
    error::SchemaError,
    library::{Library, bind},
    types::{AUTHOR, BOOK, QUERY, USER},
};

pub(crate) fn register(
    builder: &mut DispatcherBuilder,
    library: &Library,
) -> std::result::Result<(), SchemaError> {
    bind(builder, library, QUERY, "getBook", get_book)?;
    bind(builder, library, QUERY, "getBooks", |lib, _| list(lib, BOOKS))?;
    bind(builder, library, QUERY, "getAuthors", |lib, _| list(lib, AUTHORS))?;
    bind(builder, library, QUERY, "search", search)?;
    bind(builder, library, QUERY, "getAppUser", get_app_user)?;
    bind(builder, library, QUERY, "me", me)?;
    bind(builder, library, QUERY, "authenticationError", authentication_error)?;
    bind(builder, library, QUERY, "uploads", |lib, _| list(lib, FILES))?;
    bind(builder, library, QUERY, "posts", |lib, _| list(lib, POSTS))?;
    bind(builder, library, BOOK, "authors", authors_of)?;
    bind(builder, library, USER, "authors", authors_of)?;
    Ok(())
}

// ── Root fields ─────────────────────────────────────────────────────────────

/// A single book, for privileged subjects only. `color` is accepted but not
/// used for the lookup.
async fn get_book(lib: Library, call: FieldCall) -> Result<Resolved> {
    require_identity(&call.context, |p| lib.is_privileged(&p.id))?;
    let Some(id) = call.args.str("id") else {
        return Ok(Resolved::Null);
    };
    Ok(lib.repo().find_by_id(BOOKS, id).await?.into())
}

async fn list(lib: Library, collection: &'static str) -> Result<Resolved> {
    Ok(Resolved::list(lib.repo().list_all(collection).await?))
}

/// Books then authors whose title or name contains `text`, ignoring case.
async fn search(lib: Library, call: FieldCall) -> Result<Resolved> {
    let needle = call.args.str("text").map(str::to_lowercase);
    let matches = |record: &Value, key: &str| {
        needle.as_deref().is_none_or(|needle| {
            record
                .get(key)
                .and_then(Value::as_str)
                .is_some_and(|s| s.to_lowercase().contains(needle))
        })
    };

    let books = lib.repo().list_all(BOOKS).await?;
    let authors = lib.repo().list_all(AUTHORS).await?;
    let results: Vec<Resolved> = books
        .into_iter()
        .filter(|b| matches(b, "title"))
        .map(|b| Resolved::tagged(BOOK, b))
        .chain(
            authors
                .into_iter()
                .filter(|a| matches(a, "name"))
                .map(|a| Resolved::tagged(AUTHOR, a)),
        )
        .collect();
    debug!(text = ?call.args.str("text"), hits = results.len(), "search");
    Ok(Resolved::List(results))
}

async fn get_app_user(_lib: Library, call: FieldCall) -> Result<Resolved> {
    let Some(id) = call.args.str("id") else {
        return Ok(Resolved::Null);
    };
    Ok(call.context.accessors().users.get_by_id(id).await?.into())
}

async fn me(_lib: Library, call: FieldCall) -> Result<Resolved> {
    Ok(call.context.identity().map(Principal::to_record).into())
}

async fn authentication_error(_lib: Library, _call: FieldCall) -> Result<Resolved> {
    Err(ResolveError::unauthenticated("must authenticate"))
}

// ── Nested fields ───────────────────────────────────────────────────────────

/// The author sharing the parent's id, as a one-element list.
async fn authors_of(lib: Library, call: FieldCall) -> Result<Resolved> {
    let Some(id) = call.parent.get("id").and_then(Value::as_str) else {
        return Ok(Resolved::List(Vec::new()));
    };
    let author = lib.repo().find_by_id(AUTHORS, id).await?;
    Ok(Resolved::list(author))
}
