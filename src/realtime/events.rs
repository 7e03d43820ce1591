//! Quiz domain events pushed to session viewers.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use super::{BroadcastManager, BroadcastOutcome};

/// Event names as seen by `EventSource.addEventListener` on the client
pub mod event_names {
    pub const CONNECTED: &str = "connected";
    pub const PARTICIPANT_JOINED: &str = "participant_joined";
    pub const RESPONSE_RECEIVED: &str = "response_received";
    pub const PARTICIPANT_COMPLETED: &str = "participant_completed";
    pub const ANALYTICS_UPDATE: &str = "analytics_update";
    pub const PARTICIPANT_DELETED: &str = "participant_deleted";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantJoined {
    pub participant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "Utc::now")]
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseReceived {
    pub participant_id: String,
    pub question_id: String,
    /// Questions this participant has answered so far
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answered_count: Option<u32>,
    #[serde(default = "Utc::now")]
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantCompleted {
    pub participant_id: String,
    /// Score per workplace-preference dimension
    pub scores: BTreeMap<String, f64>,
    #[serde(default = "Utc::now")]
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsUpdate {
    pub total_participants: u64,
    pub completed_participants: u64,
    #[serde(default)]
    pub average_scores: BTreeMap<String, f64>,
    #[serde(default = "Utc::now")]
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDeleted {
    pub participant_id: String,
    #[serde(default = "Utc::now")]
    pub deleted_at: DateTime<Utc>,
}

/// Any domain event, tagged by `type` for the publishing API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuizEvent {
    ParticipantJoined(ParticipantJoined),
    ResponseReceived(ResponseReceived),
    ParticipantCompleted(ParticipantCompleted),
    AnalyticsUpdate(AnalyticsUpdate),
    ParticipantDeleted(ParticipantDeleted),
}

impl QuizEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            QuizEvent::ParticipantJoined(_) => event_names::PARTICIPANT_JOINED,
            QuizEvent::ResponseReceived(_) => event_names::RESPONSE_RECEIVED,
            QuizEvent::ParticipantCompleted(_) => event_names::PARTICIPANT_COMPLETED,
            QuizEvent::AnalyticsUpdate(_) => event_names::ANALYTICS_UPDATE,
            QuizEvent::ParticipantDeleted(_) => event_names::PARTICIPANT_DELETED,
        }
    }

    /// Broadcast the event payload (without the `type` tag) to a session
    pub async fn broadcast(&self, manager: &BroadcastManager, session_code: &str) -> BroadcastOutcome {
        let event = self.event_name();
        match self {
            QuizEvent::ParticipantJoined(p) => manager.broadcast(session_code, event, p).await,
            QuizEvent::ResponseReceived(p) => manager.broadcast(session_code, event, p).await,
            QuizEvent::ParticipantCompleted(p) => manager.broadcast(session_code, event, p).await,
            QuizEvent::AnalyticsUpdate(p) => manager.broadcast(session_code, event, p).await,
            QuizEvent::ParticipantDeleted(p) => manager.broadcast(session_code, event, p).await,
        }
    }
}

/// Canonical form of a session code: surrounding whitespace removed, ASCII upper-case.
///
/// The stream endpoint registers viewers under this form, so publishers must
/// use it too.
pub fn canonical_session_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Fire-and-forget publishing of domain events.
///
/// Each call spawns the broadcast and returns immediately. The returned
/// handle may be awaited for the outcome or simply dropped. Session codes
/// are canonicalized with [`canonical_session_code`] before lookup.
#[derive(Clone)]
pub struct RealtimeNotifier {
    manager: Arc<BroadcastManager>,
}

impl RealtimeNotifier {
    pub fn new(manager: Arc<BroadcastManager>) -> Self {
        Self { manager }
    }

    pub fn participant_joined(&self, session_code: &str, event: ParticipantJoined) -> JoinHandle<BroadcastOutcome> {
        self.publish(session_code, QuizEvent::ParticipantJoined(event))
    }

    pub fn response_received(&self, session_code: &str, event: ResponseReceived) -> JoinHandle<BroadcastOutcome> {
        self.publish(session_code, QuizEvent::ResponseReceived(event))
    }

    pub fn participant_completed(
        &self,
        session_code: &str,
        event: ParticipantCompleted,
    ) -> JoinHandle<BroadcastOutcome> {
        self.publish(session_code, QuizEvent::ParticipantCompleted(event))
    }

    pub fn analytics_update(&self, session_code: &str, event: AnalyticsUpdate) -> JoinHandle<BroadcastOutcome> {
        self.publish(session_code, QuizEvent::AnalyticsUpdate(event))
    }

    pub fn participant_deleted(&self, session_code: &str, event: ParticipantDeleted) -> JoinHandle<BroadcastOutcome> {
        self.publish(session_code, QuizEvent::ParticipantDeleted(event))
    }

    pub fn publish(&self, session_code: &str, event: QuizEvent) -> JoinHandle<BroadcastOutcome> {
        let manager = self.manager.clone();
        let session_code = canonical_session_code(session_code);

        tracing::debug!(
            session_code = %session_code,
            event = event.event_name(),
            "Publishing quiz event"
        );

        tokio::spawn(async move { event.broadcast(&manager, &session_code).await })
    }
}
