//! Resolver-local authorization checks.
//!
//! Guards run inside a resolver before it touches any data. They return the
//! principal on success so the resolver can use it directly.

use quire_common::{ResolveError, Result};

use crate::{context::RequestContext, identity::Principal};

/// Require an identity satisfying `predicate`.
pub fn require_principal<F>(identity: Option<&Principal>, predicate: F) -> Result<&Principal>
where
    F: FnOnce(&Principal) -> bool,
{
    let principal =
        identity.ok_or_else(|| ResolveError::forbidden("authentication is required"))?;
    if predicate(principal) {
        Ok(principal)
    } else {
        Err(ResolveError::forbidden(format!(
            "{} is not allowed to perform this operation",
            principal.display_name
        )))
    }
}

/// [`require_principal`] over a request context.
pub fn require_identity<F>(context: &RequestContext, predicate: F) -> Result<&Principal>
where
    F: FnOnce(&Principal) -> bool,
{
    require_principal(context.identity(), predicate)
}

pub fn require_authenticated(context: &RequestContext) -> Result<&Principal> {
    require_identity(context, |_| true)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn principal(id: &str) -> Principal {
        Principal {
            id: id.into(),
            display_name: format!("user {id}"),
            phone: None,
            email: None,
        }
    }

    #[test]
    fn missing_identity_is_forbidden() {
        let err = require_principal(None, |_| true).unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN");
    }

    #[test]
    fn predicate_decides() {
        let p = principal("1");
        assert_eq!(require_principal(Some(&p), |p| p.id == "1").unwrap().id, "1");

        let other = principal("2");
        let err = require_principal(Some(&other), |p| p.id == "1").unwrap_err();
        assert!(matches!(err, ResolveError::Authorization { .. }));
        assert!(err.to_string().contains("user 2"));
    }
}
