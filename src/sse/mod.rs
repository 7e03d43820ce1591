//! Server-Sent Events endpoint for live session viewers.
//!
//! Every viewer of a quiz session (host dashboard, projector view, ...)
//! opens one long-lived stream. The stream joins the session's room in the
//! [`BroadcastManager`](crate::realtime::BroadcastManager) and receives every
//! event broadcast to that session.
//!
//! # Endpoint
//!
//! `GET /api/sessions/{code}/stream`
//!
//! # Event Types
//!
//! - `connected` - Always the first frame, carries the session code and an ISO-8601 timestamp
//! - `participant_joined`, `response_received`, `participant_completed`,
//!   `analytics_update`, `participant_deleted` - Session activity
//! - `:heartbeat <millis>` - Comment frame keeping proxies from idling the stream out

mod handler;

pub use handler::{normalize_session_code, sse_handler, ConnectedEvent};
