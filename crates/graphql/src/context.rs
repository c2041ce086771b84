//! Schema-wide state injected into every mounted resolver.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{
    dispatch::Dispatcher,
    events::{EventChannel, EventStream},
};

/// Stored once in the schema data and read back with
/// `ctx.data::<Arc<GqlContext>>()`.
///
/// Per-request state (the `RequestContext` and, for connections, the
/// cancellation token) travels in the request data instead.
pub struct GqlContext {
    pub dispatcher: Arc<Dispatcher>,

    /// Topic channel backing subscription fields.
    pub events: EventChannel,
}

impl GqlContext {
    pub fn new(dispatcher: Arc<Dispatcher>, events: EventChannel) -> Self {
        Self { dispatcher, events }
    }

    /// Subscribe to a topic until `cancel` fires.
    pub fn subscribe(&self, topic: &str, cancel: CancellationToken) -> EventStream {
        self.events.subscribe(topic, cancel)
    }
}
