use thiserror::Error;

use super::{ClientId, SinkError};

/// Failures surfaced by the realtime layer to its callers.
///
/// Broadcast fan-out never produces these; per-client write failures during
/// a broadcast are handled by evicting the client.
#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("Failed to deliver frame to client {client_id}: {source}")]
    Delivery {
        client_id: ClientId,
        #[source]
        source: SinkError,
    },

    #[error("Failed to serialize event payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid event name: {0:?}")]
    InvalidEventName(String),
}
