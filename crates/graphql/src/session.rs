//! Persistent (subscription) connections.
//!
//! A connection authenticates once, from its init payload. Every operation
//! sent on it afterwards runs with that same context, and closing the
//! connection ends every subscription stream started on it.

use {
    async_graphql::Request,
    quire_auth::{ContextBuilder, RequestContext, RequestMetadata},
    quire_common::Result,
    serde_json::Value,
    tokio_util::sync::CancellationToken,
    tracing::debug,
};

#[derive(Debug)]
pub struct ConnectionSession {
    context: RequestContext,
    cancel: CancellationToken,
}

impl ConnectionSession {
    /// Authenticate a new connection from its init payload.
    pub async fn open(builder: &ContextBuilder, init_payload: &Value) -> Result<Self> {
        let metadata = RequestMetadata::from_init_payload(init_payload);
        let context = builder.build(&metadata, None).await?;
        debug!(
            subject = context.identity().map(|p| p.id.as_str()),
            "connection opened"
        );
        Ok(Self {
            context,
            cancel: CancellationToken::new(),
        })
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    /// Context for an operation on this connection. Per-message metadata is
    /// ignored; the connection keeps the identity it was opened with.
    pub async fn context_for(
        &self,
        builder: &ContextBuilder,
        metadata: &RequestMetadata,
    ) -> Result<RequestContext> {
        builder.build(metadata, Some(&self.context)).await
    }

    /// Wrap an operation so it runs with this connection's context and its
    /// subscriptions end when the connection closes.
    pub fn request(&self, request: impl Into<Request>) -> Request {
        request
            .into()
            .data(self.context.clone())
            .data(self.cancel.clone())
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// End every listener attached through this connection.
    pub fn close(&self) {
        if !self.cancel.is_cancelled() {
            debug!("connection closed");
            self.cancel.cancel();
        }
    }
}

impl Drop for ConnectionSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use {
        super::*,
        quire_auth::AuthPolicy,
        quire_config::AuthConfig,
        quire_store::MemoryRepository,
        serde_json::json,
    };

    fn builder(policy: AuthPolicy) -> ContextBuilder {
        let config = AuthConfig {
            policy: Some(policy),
            ..AuthConfig::default()
        };
        ContextBuilder::from_config(Arc::new(MemoryRepository::seeded()), &config).unwrap()
    }

    #[tokio::test]
    async fn connection_context_is_reused_for_every_operation() {
        let builder = builder(AuthPolicy::Permissive);
        let session = ConnectionSession::open(
            &builder,
            &json!({"authentication": "ADMIN", "uid": "1"}),
        )
        .await
        .unwrap();
        assert_eq!(session.context().identity().unwrap().display_name, "Naira Marley");

        let other = RequestMetadata::new()
            .with("authentication", "ADMIN")
            .with("uid", "2");
        let ctx = session.context_for(&builder, &other).await.unwrap();
        assert!(ctx.ptr_eq(session.context()));
        assert_eq!(ctx.identity().unwrap().id, "1");
    }

    #[tokio::test]
    async fn strict_policy_rejects_anonymous_connections() {
        let err = ConnectionSession::open(&builder(AuthPolicy::Strict), &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn close_and_drop_cancel_listeners() {
        let builder = builder(AuthPolicy::Permissive);
        let session = ConnectionSession::open(&builder, &json!({})).await.unwrap();
        let token = session.cancellation();
        assert!(!session.is_closed());
        session.close();
        assert!(token.is_cancelled());
        session.close();

        let session = ConnectionSession::open(&builder, &json!({})).await.unwrap();
        let token = session.cancellation();
        drop(session);
        assert!(token.is_cancelled());
    }
}
