//! Mutation resolvers of the library schema.

use {
    quire_common::{ResolveError, Result},
    quire_service_traits::collections::{FILES, POSTS},
    serde_json::{Value, json},
    tracing::{debug, info},
};

use crate::{
    dispatch::{DispatcherBuilder, FieldCall, Resolved},
    error::SchemaError,
    library::{Library, bind},
    subscriptions::publish_post,
    types::MUTATION,
};

/// The only `input` `userInputError` accepts.
const EXPECTED_INPUT: &str = "expected";

pub(crate) fn register(
    builder: &mut DispatcherBuilder,
    library: &Library,
) -> std::result::Result<(), SchemaError> {
    bind(builder, library, MUTATION, "userInputError", user_input_error)?;
    bind(builder, library, MUTATION, "singleUpload", single_upload)?;
    bind(builder, library, MUTATION, "addPost", add_post)?;
    Ok(())
}

/// Rejects every input but `"expected"`, naming all supplied arguments.
async fn user_input_error(_lib: Library, call: FieldCall) -> Result<Resolved> {
    if call.args.str("input") != Some(EXPECTED_INPUT) {
        return Err(ResolveError::invalid_argument(
            "Form Arguments invalid",
            call.args.names(),
        ));
    }
    Ok(Resolved::Null)
}

/// Wait for the upload to settle, then record and return its metadata.
async fn single_upload(lib: Library, mut call: FieldCall) -> Result<Resolved> {
    let Some(upload) = call.args.take_upload("file") else {
        return Err(ResolveError::invalid_argument("file is required", ["file"]));
    };
    let file = upload.await?;
    info!(filename = %file.filename, mimetype = %file.mimetype, "file uploaded");
    let record = serde_json::to_value(&file).map_err(ResolveError::other)?;
    lib.repo().insert(FILES, record.clone()).await?;
    Ok(Resolved::Value(record))
}

/// Record a post and announce it on `postAdded`.
async fn add_post(lib: Library, call: FieldCall) -> Result<Resolved> {
    let post = json!({
        "author": call.args.get("author").cloned().unwrap_or(Value::Null),
        "comment": call.args.get("comment").cloned().unwrap_or(Value::Null),
    });
    lib.repo().insert(POSTS, post.clone()).await?;
    let reached = publish_post(lib.events(), post.clone());
    debug!(reached, "post added");
    Ok(Resolved::Value(post))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use {
        super::*,
        crate::{
            dispatch::{Arguments, Dispatcher},
            events::EventChannel,
            types::POST_ADDED,
        },
        quire_auth::{AccessorFactory, RequestContext},
        quire_config::AuthConfig,
        quire_service_traits::{FileUpload, Repository, ServiceError, ready_upload},
        quire_store::MemoryRepository,
        serde_json::Map,
        tokio::time::{Duration, timeout},
        tokio_stream::StreamExt,
        tokio_util::sync::CancellationToken,
    };

    struct Fixture {
        repo: Arc<MemoryRepository>,
        events: EventChannel,
        dispatcher: Dispatcher,
        context: RequestContext,
    }

    fn fixture() -> Fixture {
        let repo = Arc::new(MemoryRepository::seeded());
        let events = EventChannel::default();
        let library = Library::new(repo.clone(), events.clone(), &AuthConfig::default());
        Fixture {
            dispatcher: library.dispatcher().unwrap(),
            context: RequestContext::new(None, AccessorFactory::new(repo.clone()).build(None)),
            repo,
            events,
        }
    }

    impl Fixture {
        async fn run(&self, field: &str, args: Arguments) -> Result<Resolved> {
            let field = Arc::clone(self.dispatcher.schema().field(MUTATION, field).unwrap());
            self.dispatcher
                .dispatch(&field, Value::Null, args, &self.context)
                .await
        }
    }

    fn args(values: Value) -> Arguments {
        match values {
            Value::Object(map) => Arguments::new(map),
            _ => Arguments::new(Map::new()),
        }
    }

    #[tokio::test]
    async fn user_input_error_lists_supplied_arguments() {
        let fx = fixture();
        let err = fx
            .run("userInputError", args(json!({"input": "nope"})))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "BAD_USER_INPUT");
        assert!(matches!(
            err,
            ResolveError::InvalidArgument { ref arguments, .. } if arguments == &["input"]
        ));

        let ok = fx
            .run("userInputError", args(json!({"input": "expected"})))
            .await
            .unwrap();
        assert!(ok.is_null());
    }

    #[tokio::test]
    async fn single_upload_records_settled_metadata() {
        let fx = fixture();
        let meta = FileUpload {
            filename: "notes.txt".into(),
            mimetype: "text/plain".into(),
            encoding: "7bit".into(),
        };
        let res = fx
            .run(
                "singleUpload",
                args(Value::Null).with_upload("file", ready_upload(meta.clone())),
            )
            .await
            .unwrap();
        assert_eq!(res, Resolved::Value(serde_json::to_value(&meta).unwrap()));
        let files = fx.repo.list_all(FILES).await.unwrap();
        assert_eq!(files, vec![serde_json::to_value(&meta).unwrap()]);
    }

    #[tokio::test]
    async fn failed_upload_is_a_resolver_error() {
        let fx = fixture();
        let failing = Box::pin(async { Err::<FileUpload, _>(ServiceError::from("stream reset")) });
        let err = fx
            .run("singleUpload", args(Value::Null).with_upload("file", failing))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INTERNAL_SERVER_ERROR");
        assert!(fx.repo.list_all(FILES).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_post_records_and_publishes() {
        let fx = fixture();
        let mut stream = fx.events.subscribe(POST_ADDED, CancellationToken::new());
        let res = fx
            .run("addPost", args(json!({"author": "A", "comment": "hi"})))
            .await
            .unwrap();
        assert_eq!(res, Resolved::Value(json!({"author": "A", "comment": "hi"})));

        let got = timeout(Duration::from_secs(1), stream.next()).await.unwrap();
        assert_eq!(got, Some(json!({"author": "A", "comment": "hi"})));
        assert_eq!(fx.repo.list_all(POSTS).await.unwrap().len(), 1);
    }
}
