//! Realtime broadcast layer.
//!
//! Owns the session registry that maps a session code to the set of SSE
//! clients currently streaming that session, and fans events out to them.
//!
//! # Lifecycle
//!
//! A session becomes active when its first client registers and is torn
//! down the moment its last client leaves, whether that happens through an
//! explicit deregistration, a failed heartbeat, or a failed broadcast write.
//! There is no separate "close session" operation.
//!
//! [`BroadcastManager`] matches session codes exactly. The stream endpoint
//! and [`RealtimeNotifier`] both apply [`canonical_session_code`] first, so
//! code that calls the manager directly should do the same.
//!
//! # Wire format
//!
//! ```text
//! event: participant_joined
//! data: {"participantId":"p-1","joinedAt":"2026-01-01T00:00:00Z"}
//! id: 1767225600000
//!
//! ```
//!
//! Heartbeats are bare comment frames (`:heartbeat <millis>`) that never
//! trigger a named handler on the client.

mod client;
mod error;
mod events;
mod frame;
mod manager;
mod stats;

pub use client::{ChannelSink, ClientHandle, ClientId, ClientSink, SinkError};
pub use error::RealtimeError;
pub use events::{
    canonical_session_code, event_names, AnalyticsUpdate, ParticipantCompleted, ParticipantDeleted, ParticipantJoined,
    QuizEvent, RealtimeNotifier, ResponseReceived,
};
pub use frame::{format_event, format_event_with_id, heartbeat_frame, validate_event_name};
pub use manager::{BroadcastManager, BroadcastOutcome};
pub use stats::{
    HealthMetrics, MemoryUsage, SessionStats, SessionSummary, StatsUpdate, StatsUpdateKind,
};
