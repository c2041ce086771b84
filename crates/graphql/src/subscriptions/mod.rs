//! Event publication for the subscription root.
//!
//! Subscription fields are mounted straight onto the [`EventChannel`] topic
//! named by their descriptor; this module holds the publishing side.

use {serde_json::Value, tracing::debug};

use crate::{events::EventChannel, types::POST_ADDED};

/// Push a newly recorded post to every `postAdded` listener.
pub fn publish_post(events: &EventChannel, post: Value) -> usize {
    let reached = events.publish(POST_ADDED, post);
    debug!(reached, "post announced");
    reached
}
