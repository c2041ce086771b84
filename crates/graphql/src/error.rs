//! Schema construction errors and mapping of resolve errors to GraphQL errors.

use {
    async_graphql::{ErrorExtensions, Value as GqlValue},
    quire_common::FromMessage,
    thiserror::Error,
};

pub use quire_common::ResolveError;

/// Failure while declaring, wiring or mounting a schema.
///
/// These surface once at startup; none of them can happen while a request is
/// being resolved.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid type reference {raw:?} at {location}")]
    InvalidTypeRef { location: String, raw: String },

    #[error("type {0} is declared more than once")]
    DuplicateType(String),

    #[error("field {type_name}.{field} is declared more than once")]
    DuplicateField { type_name: String, field: String },

    #[error("{location} references unknown type {name}")]
    UnknownType { location: String, name: String },

    #[error("argument {location} must be a scalar or enum, found {name}")]
    NotAnInputType { location: String, name: String },

    #[error("union {union} member {member} is not an object type")]
    InvalidUnionMember { union: String, member: String },

    #[error("union {0} has no members")]
    EmptyUnion(String),

    #[error("shape of {type_name} names unknown field {field}")]
    UnknownShapeField { type_name: String, field: String },

    #[error("{role} root type {name} is not a declared object")]
    InvalidRoot { role: &'static str, name: String },

    #[error("no query root type declared")]
    MissingQueryRoot,

    #[error("field {type_name}.{field} is not declared")]
    UnknownField { type_name: String, field: String },

    #[error("field {type_name}.{field} already has a resolver")]
    DuplicateResolver { type_name: String, field: String },

    #[error("unknown directive @{directive} on {field}")]
    UnknownDirective { field: String, directive: String },

    #[error("invalid arguments for @{directive} on {field}: {message}")]
    InvalidDirectiveArguments {
        field: String,
        directive: String,
        message: String,
    },

    #[error("failed to mount schema: {0}")]
    Mount(String),
}

impl FromMessage for SchemaError {
    fn from_message(message: String) -> Self {
        Self::Mount(message)
    }
}

pub type Error = SchemaError;
pub type Result<T> = std::result::Result<T, Error>;

quire_common::impl_context!();

/// Convert a resolve error into an `async_graphql::Error` carrying its code.
pub fn gql_err(err: ResolveError) -> async_graphql::Error {
    let code = err.code();
    let invalid_args = match &err {
        ResolveError::InvalidArgument { arguments, .. } => Some(arguments.clone()),
        _ => None,
    };
    async_graphql::Error::new(err.to_string()).extend_with(|_, ext| {
        ext.set("code", code);
        if let Some(args) = invalid_args {
            ext.set(
                "invalidArgs",
                GqlValue::List(args.into_iter().map(GqlValue::String).collect()),
            );
        }
    })
}
