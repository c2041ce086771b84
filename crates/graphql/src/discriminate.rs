//! Union type discrimination.
//!
//! Resolvers should tag union results explicitly with
//! [`Resolved::Tagged`](crate::dispatch::Resolved::Tagged). Untagged values
//! fall back to a structural match: the first member, in declaration order,
//! whose shape fields are all present and non-null on the value. This is
//! best effort; members with overlapping shapes resolve to whichever is
//! declared first.

use {quire_common::ResolveError, serde_json::Value};

use crate::descriptor::{SchemaDescriptor, UnionDescriptor};

/// Accept an explicit tag if it names a member of `union`.
pub fn check_tag(union: &UnionDescriptor, type_name: &str) -> Result<(), ResolveError> {
    if union.has_member(type_name) {
        Ok(())
    } else {
        Err(ResolveError::unresolved_type(
            &union.name,
            format!("{type_name} is not a member"),
        ))
    }
}

/// Pick the concrete member type of an untagged value.
pub fn discriminate<'u>(
    schema: &SchemaDescriptor,
    union: &'u UnionDescriptor,
    value: &Value,
) -> Result<&'u str, ResolveError> {
    let Some(object) = value.as_object() else {
        return Err(ResolveError::unresolved_type(
            &union.name,
            "value is not an object",
        ));
    };

    union
        .members
        .iter()
        .find(|member| {
            schema.object(member).is_some_and(|o| {
                !o.shape().is_empty()
                    && o
                        .shape()
                        .iter()
                        .all(|f| object.get(f).is_some_and(|v| !v.is_null()))
            })
        })
        .map(String::as_str)
        .ok_or_else(|| ResolveError::unresolved_type(&union.name, "no member matches the value"))
}
