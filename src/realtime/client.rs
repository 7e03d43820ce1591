//! Client output handles.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::timeout;
use uuid::Uuid;

/// Identity of a connected client; set membership is keyed by it
pub type ClientId = Uuid;

/// Upper bound on how long a single frame write may wait for buffer space
const WRITE_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SinkError {
    #[error("client stream is closed")]
    Closed,

    #[error("write timed out after {0}ms")]
    Timeout(u64),

    #[error("write failed: {0}")]
    Write(String),
}

/// Writable end of one client's stream.
#[async_trait]
pub trait ClientSink: Send + Sync {
    /// Queue a complete frame for delivery.
    async fn write(&self, frame: String) -> Result<(), SinkError>;

    fn is_closed(&self) -> bool;

    /// Close the stream. Later writes fail with [`SinkError::Closed`].
    fn close(&self);
}

/// Sink backed by a bounded channel whose receiver feeds the HTTP response body.
///
/// Closing drops the sender, so the response stream ends once in-flight
/// writes have drained.
pub struct ChannelSink {
    sender: Mutex<Option<mpsc::Sender<String>>>,
    write_timeout: Duration,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let sink = Self {
            sender: Mutex::new(Some(tx)),
            write_timeout: Duration::from_millis(WRITE_TIMEOUT_MS),
        };
        (sink, rx)
    }

    fn sender(&self) -> Option<mpsc::Sender<String>> {
        self.sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl ClientSink for ChannelSink {
    async fn write(&self, frame: String) -> Result<(), SinkError> {
        let sender = self.sender().ok_or(SinkError::Closed)?;

        match timeout(self.write_timeout, sender.send(frame)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(SinkError::Closed),
            Err(_) => Err(SinkError::Timeout(self.write_timeout.as_millis() as u64)),
        }
    }

    fn is_closed(&self) -> bool {
        match self.sender() {
            Some(sender) => sender.is_closed(),
            None => true,
        }
    }

    fn close(&self) {
        self.sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
    }
}

struct ClientInner {
    id: ClientId,
    connected_at: DateTime<Utc>,
    sink: Box<dyn ClientSink>,
}

/// Shared handle to one connected client.
///
/// Clones refer to the same client: they share an id, so registering a clone
/// twice under the same session is a duplicate registration.
#[derive(Clone)]
pub struct ClientHandle {
    inner: Arc<ClientInner>,
}

impl ClientHandle {
    pub fn new(sink: impl ClientSink + 'static) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                id: Uuid::new_v4(),
                connected_at: Utc::now(),
                sink: Box::new(sink),
            }),
        }
    }

    pub fn id(&self) -> ClientId {
        self.inner.id
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.inner.connected_at
    }

    /// Write a frame, failing fast when the client is already closed.
    pub async fn write(&self, frame: String) -> Result<(), SinkError> {
        if self.inner.sink.is_closed() {
            return Err(SinkError::Closed);
        }
        self.inner.sink.write(frame).await
    }

    pub fn is_closed(&self) -> bool {
        self.inner.sink.is_closed()
    }

    pub fn close(&self) {
        self.inner.sink.close();
    }
}

impl fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientHandle")
            .field("id", &self.inner.id)
            .field("connected_at", &self.inner.connected_at)
            .field("closed", &self.is_closed())
            .finish()
    }
}
