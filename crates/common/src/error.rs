use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure produced while resolving a single field.
///
/// Every variant is surfaced to the client attached to the field that raised
/// it; sibling fields keep resolving independently.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// No valid identity where one is required.
    #[error("{message}")]
    Unauthenticated { message: String },

    /// An identity is present but lacks the required privilege.
    #[error("{message}")]
    Authorization { message: String },

    /// Caller-supplied arguments failed a resolver's own validation.
    #[error("{message}")]
    InvalidArgument {
        message: String,
        arguments: Vec<String>,
    },

    /// A union-typed value matched no declared member.
    #[error("cannot resolve concrete type of union {union}: {reason}")]
    AmbiguousOrUnknownType { union: String, reason: String },

    /// Any other failure raised by a resolver body.
    #[error("{message}")]
    Resolver {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl ResolveError {
    #[must_use]
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_argument<I, S>(message: impl Into<String>, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::InvalidArgument {
            message: message.into(),
            arguments: arguments.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn unresolved_type(union: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AmbiguousOrUnknownType {
            union: union.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn resolver(message: impl Into<String>) -> Self {
        Self::Resolver {
            message: message.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn other(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Resolver {
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Stable machine-readable code reported alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated { .. } => "UNAUTHENTICATED",
            Self::Authorization { .. } => "FORBIDDEN",
            Self::InvalidArgument { .. } => "BAD_USER_INPUT",
            Self::AmbiguousOrUnknownType { .. } => "UNRESOLVED_TYPE",
            Self::Resolver { .. } => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl FromMessage for ResolveError {
    fn from_message(message: String) -> Self {
        Self::resolver(message)
    }
}

pub type Result<T, E = ResolveError> = std::result::Result<T, E>;

// ── Context helpers ─────────────────────────────────────────────────────────

/// Error types that can be built from a bare message.
pub trait FromMessage: Sized {
    fn from_message(message: String) -> Self;

    /// `"{context}: {cause}"`.
    fn wrap(context: impl std::fmt::Display, cause: impl std::fmt::Display) -> Self {
        Self::from_message(format!("{context}: {cause}"))
    }
}

/// Adds `context` and `with_context` on `Result` and `Option` for the
/// invoking module's `Error: FromMessage` and `Result<T>` alias.
///
/// ```ignore
/// quire_common::impl_context!();
/// ```
#[macro_export]
macro_rules! impl_context {
    () => {
        pub trait Context<T>: Sized {
            fn with_context<C: Into<String>>(self, f: impl FnOnce() -> C) -> Result<T>;

            fn context(self, context: impl Into<String>) -> Result<T> {
                let context = context.into();
                self.with_context(|| context)
            }
        }

        impl<T, E: std::fmt::Display> Context<T> for std::result::Result<T, E> {
            fn with_context<C: Into<String>>(self, f: impl FnOnce() -> C) -> Result<T> {
                self.map_err(|cause| <Error as $crate::FromMessage>::wrap(f().into(), cause))
            }
        }

        impl<T> Context<T> for Option<T> {
            fn with_context<C: Into<String>>(self, f: impl FnOnce() -> C) -> Result<T> {
                self.ok_or_else(|| <Error as $crate::FromMessage>::from_message(f().into()))
            }
        }
    };
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable_per_kind() {
        assert_eq!(
            ResolveError::unauthenticated("x").code(),
            "UNAUTHENTICATED"
        );
        assert_eq!(ResolveError::forbidden("x").code(), "FORBIDDEN");
        assert_eq!(
            ResolveError::invalid_argument("x", ["input"]).code(),
            "BAD_USER_INPUT"
        );
        assert_eq!(
            ResolveError::unresolved_type("Result", "no match").code(),
            "UNRESOLVED_TYPE"
        );
        assert_eq!(ResolveError::resolver("x").code(), "INTERNAL_SERVER_ERROR");
    }

    #[test]
    fn other_keeps_source_message() {
        let io = std::io::Error::other("disk gone");
        let err = ResolveError::other(io);
        assert_eq!(err.to_string(), "disk gone");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn wrap_prefixes_the_cause() {
        let err = ResolveError::wrap("loading users", "store closed");
        assert_eq!(err.to_string(), "loading users: store closed");
        assert_eq!(err.code(), "INTERNAL_SERVER_ERROR");
    }

    #[test]
    fn invalid_argument_lists_arguments() {
        match ResolveError::invalid_argument("bad form", ["input", "other"]) {
            ResolveError::InvalidArgument { arguments, .. } => {
                assert_eq!(arguments, vec!["input", "other"]);
            },
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
