//! Named broadcast channels
//!
//! A channel exists once someone observes it. Sends to a channel nobody
//! observes are dropped; there is no replay. Each subscriber sees the
//! messages sent after it subscribed, in send order.

use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{trace, warn};

/// A message on the bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Channel name
    pub name: String,

    /// Opaque payload
    pub payload: Value,

    /// Where the message came from, typically an execution id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl Message {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
            origin: None,
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }
}

/// Subscription returned by [`MessageBus::observe`]
pub type MessageStream = Pin<Box<dyn Stream<Item = Message> + Send>>;

#[derive(Debug, Clone)]
struct Envelope {
    epoch: u64,
    message: Message,
}

#[derive(Debug)]
struct BusInner {
    channels: Mutex<HashMap<String, broadcast::Sender<Envelope>>>,
    capacity: usize,
    /// Bumped by `clear`; envelopes from older epochs are discarded
    epoch: Arc<AtomicU64>,
}

/// Handle to a shared set of channels
///
/// Clones refer to the same channels.
#[derive(Debug, Clone)]
pub struct MessageBus {
    inner: Arc<BusInner>,
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new(64)
    }
}

impl MessageBus {
    /// Create a bus whose channels buffer up to `capacity` messages
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(BusInner {
                channels: Mutex::new(HashMap::new()),
                capacity: capacity.max(1),
                epoch: Arc::new(AtomicU64::new(0)),
            }),
        }
    }

    /// Publish a message; returns how many subscribers it reached
    ///
    /// A channel whose subscribers have all gone away is removed here.
    pub fn send(&self, message: Message) -> usize {
        let mut channels = self
            .inner
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = channels.get(&message.name) else {
            trace!(channel = %message.name, "No channel, message dropped");
            return 0;
        };
        if sender.receiver_count() == 0 {
            channels.remove(&message.name);
            trace!(channel = %message.name, "Channel abandoned, removed");
            return 0;
        }
        let epoch = self.inner.epoch.load(Ordering::SeqCst);
        let name = message.name.clone();
        let delivered = sender.send(Envelope { epoch, message }).unwrap_or(0);
        trace!(channel = %name, delivered, "Message sent");
        delivered
    }

    /// Subscribe to a channel, creating it if needed
    ///
    /// The stream ends when the bus is cleared.
    pub fn observe(&self, name: &str) -> MessageStream {
        let receiver = self
            .inner
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_string())
            .or_insert_with(|| broadcast::channel(self.inner.capacity).0)
            .subscribe();

        let epoch = self.inner.epoch.clone();
        let channel = name.to_string();
        Box::pin(
            BroadcastStream::new(receiver).filter_map(move |item| match item {
                Ok(envelope) if envelope.epoch == epoch.load(Ordering::SeqCst) => {
                    Some(envelope.message)
                }
                Ok(_) => None,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(channel = %channel, skipped, "Subscriber lagged, messages lost");
                    None
                }
            }),
        )
    }

    /// Drop every channel and any undelivered messages
    pub fn clear(&self) {
        let mut channels = self
            .inner
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        channels.clear();
    }

    /// Number of live channels
    pub fn channel_count(&self) -> usize {
        self.inner
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
