//! Topic-based event fan-out for subscription fields.
//!
//! Each topic gets its own broadcast channel, created on first subscribe and
//! removed once its last listener detaches.
//! Events are delivered to the listeners attached at publish time and are
//! never retained: publishing to a topic nobody listens on drops the event.

use std::{
    collections::HashMap,
    pin::Pin,
    sync::{Arc, Mutex},
};

use {
    quire_config::EventsConfig,
    serde_json::Value,
    tokio::sync::broadcast::{self, error::RecvError},
    tokio_stream::Stream,
    tokio_util::sync::CancellationToken,
    tracing::{debug, warn},
};

/// Payloads of one topic, as seen by one listener.
pub type EventStream = Pin<Box<dyn Stream<Item = Value> + Send>>;

#[derive(Clone)]
pub struct EventChannel {
    topics: Arc<Mutex<HashMap<String, broadcast::Sender<Value>>>>,
    capacity: usize,
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::from_config(&EventsConfig::default())
    }
}

impl EventChannel {
    /// `capacity` bounds how far a listener may fall behind before it starts
    /// skipping events.
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    pub fn from_config(config: &EventsConfig) -> Self {
        Self::new(config.capacity)
    }

    /// Deliver `payload` to every current listener of `topic`.
    ///
    /// Returns the number of listeners reached.
    pub fn publish(&self, topic: &str, payload: Value) -> usize {
        let sender = {
            let topics = self.topics.lock().unwrap_or_else(|e| e.into_inner());
            topics.get(topic).cloned()
        };
        let reached = sender.map_or(0, |tx| tx.send(payload).unwrap_or(0));
        if reached == 0 {
            debug!(topic, "no listeners, event dropped");
        } else {
            debug!(topic, reached, "event published");
        }
        reached
    }

    /// Current listener count for `topic`.
    pub fn listeners(&self, topic: &str) -> usize {
        self.topics
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(topic)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Listen to `topic` until `cancel` fires.
    ///
    /// The listener is attached before this returns, so events published
    /// afterwards are delivered even if the stream is not polled yet.
    pub fn subscribe(&self, topic: impl Into<String>, cancel: CancellationToken) -> EventStream {
        let topic = topic.into();
        let rx = {
            let mut topics = self.topics.lock().unwrap_or_else(|e| e.into_inner());
            topics
                .entry(topic.clone())
                .or_insert_with(|| broadcast::channel(self.capacity).0)
                .subscribe()
        };
        debug!(topic = %topic, "listener attached");

        let mut listener = Listener {
            rx: Some(rx),
            topics: Arc::clone(&self.topics),
            topic,
        };
        Box::pin(async_stream::stream! {
            loop {
                let received = tokio::select! {
                    biased;
                    () = cancel.cancelled() => None,
                    received = listener.recv() => Some(received),
                };
                match received {
                    None => break,
                    Some(Ok(payload)) => yield payload,
                    Some(Err(RecvError::Lagged(skipped))) => {
                        warn!(topic = %listener.topic, skipped, "listener fell behind, events skipped");
                    },
                    Some(Err(RecvError::Closed)) => break,
                }
            }
            debug!(topic = %listener.topic, "listener detached");
        })
    }

    /// Number of topics with at least one attached listener.
    pub fn topic_count(&self) -> usize {
        self.topics.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// One receiver of a topic. Dropping the last one removes the topic.
struct Listener {
    rx: Option<broadcast::Receiver<Value>>,
    topics: Arc<Mutex<HashMap<String, broadcast::Sender<Value>>>>,
    topic: String,
}

impl Listener {
    async fn recv(&mut self) -> Result<Value, RecvError> {
        match self.rx.as_mut() {
            Some(rx) => rx.recv().await,
            None => Err(RecvError::Closed),
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        let mut topics = self.topics.lock().unwrap_or_else(|e| e.into_inner());
        drop(self.rx.take());
        if topics
            .get(&self.topic)
            .is_some_and(|tx| tx.receiver_count() == 0)
        {
            topics.remove(&self.topic);
            debug!(topic = %self.topic, "topic pruned");
        }
    }
}
