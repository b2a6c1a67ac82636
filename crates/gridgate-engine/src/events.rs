//! Per-engine event notifications.

use gridgate_client::{Error as ClientError, FileParams};
use tokio::sync::broadcast;

use crate::Error;
use crate::upload::StoredFile;

/// Tracing target for event emission.
const TRACING_TARGET: &str = "gridgate_engine::events";

/// Broadcast capacity per engine; lagging subscribers lose oldest events
/// rather than exerting backpressure on uploads.
const EVENT_CAPACITY: usize = 64;

/// Notifications emitted by a [`GridEngine`](crate::GridEngine).
///
/// `Connected` and `ConnectionFailed` are mutually exclusive and fire at
/// most once over the engine's lifetime; `FileStored` and `StreamError`
/// fire once per file; `BackendError` fires whenever the underlying
/// connection reports an asynchronous error after becoming ready (only for
/// engines that own their connection via a URL).
#[derive(Debug, Clone)]
pub enum Event {
    /// The backing connection became ready
    Connected,
    /// The backing connection failed to establish
    ConnectionFailed(Error),
    /// A file was stored successfully
    FileStored(StoredFile),
    /// A file's storage write failed
    StreamError {
        /// The write failure
        error: Error,
        /// The parameters the failed upload had resolved to
        params: FileParams,
    },
    /// The ready connection reported an asynchronous error
    BackendError(ClientError),
}

/// Per-engine broadcast channel for [`Event`]s.
///
/// Cheap to clone; clones share the channel. Emission never blocks and
/// never fails the pipeline; with no live subscriber the event is dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a bus with the default capacity.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    /// Register a new subscriber. Only events emitted after this call are
    /// observed.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Emit an event to all current subscribers.
    pub fn emit(&self, event: Event) {
        tracing::trace!(target: TRACING_TARGET, event = ?event, "emitting event");
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
