//! CONTEST_EVENT and PARTICIPANT_EVENT payloads

use serde::{Deserialize, Serialize};
use socket_core::{
    ContestCreatedEvent, ContestEndedEvent, ContestStartedEvent, ParticipantRegisteredEvent,
    ParticipantUnregisteredEvent, ProblemAddedEvent, ProblemRemovedEvent, UserId,
};

/// Lifecycle step reported by a CONTEST_EVENT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContestEventKind {
    Created,
    Started,
    Ended,
    ProblemAdded,
    ProblemRemoved,
}

/// Payload of CONTEST_EVENT
///
/// Only the fields relevant to the event kind are present on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContestEventPayload {
    #[serde(rename = "type")]
    pub kind: ContestEventKind,
    pub contest_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scoring_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub timestamp: String,
}

impl ContestEventPayload {
    fn bare(kind: ContestEventKind, contest_id: &str, timestamp: &str) -> Self {
        Self {
            kind,
            contest_id: contest_id.to_string(),
            title: None,
            slug: None,
            visibility: None,
            scoring_mode: None,
            start_time: None,
            end_time: None,
            problem_id: None,
            label: None,
            timestamp: timestamp.to_string(),
        }
    }
}

impl From<&ContestCreatedEvent> for ContestEventPayload {
    fn from(event: &ContestCreatedEvent) -> Self {
        Self {
            title: Some(event.title.clone()),
            slug: Some(event.slug.clone()),
            visibility: Some(event.visibility.clone()),
            scoring_mode: Some(event.scoring_mode.clone()),
            start_time: Some(event.start_time.clone()),
            end_time: Some(event.end_time.clone()),
            ..Self::bare(ContestEventKind::Created, &event.contest_id, &event.timestamp)
        }
    }
}

impl From<&ContestStartedEvent> for ContestEventPayload {
    fn from(event: &ContestStartedEvent) -> Self {
        Self {
            title: Some(event.title.clone()),
            start_time: Some(event.start_time.clone()),
            ..Self::bare(ContestEventKind::Started, &event.contest_id, &event.timestamp)
        }
    }
}

impl From<&ContestEndedEvent> for ContestEventPayload {
    fn from(event: &ContestEndedEvent) -> Self {
        Self {
            title: Some(event.title.clone()),
            end_time: Some(event.end_time.clone()),
            ..Self::bare(ContestEventKind::Ended, &event.contest_id, &event.timestamp)
        }
    }
}

impl From<&ProblemAddedEvent> for ContestEventPayload {
    fn from(event: &ProblemAddedEvent) -> Self {
        Self {
            problem_id: Some(event.problem_id.clone()),
            label: Some(event.label.clone()),
            ..Self::bare(ContestEventKind::ProblemAdded, &event.contest_id, &event.timestamp)
        }
    }
}

impl From<&ProblemRemovedEvent> for ContestEventPayload {
    fn from(event: &ProblemRemovedEvent) -> Self {
        Self {
            problem_id: Some(event.problem_id.clone()),
            ..Self::bare(ContestEventKind::ProblemRemoved, &event.contest_id, &event.timestamp)
        }
    }
}

/// Registration change reported by a PARTICIPANT_EVENT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantEventKind {
    Registered,
    Unregistered,
}

/// Payload of PARTICIPANT_EVENT
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantEventPayload {
    #[serde(rename = "type")]
    pub kind: ParticipantEventKind,
    pub contest_id: String,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_virtual: Option<bool>,
    pub timestamp: String,
}

impl From<&ParticipantRegisteredEvent> for ParticipantEventPayload {
    fn from(event: &ParticipantRegisteredEvent) -> Self {
        Self {
            kind: ParticipantEventKind::Registered,
            contest_id: event.contest_id.clone(),
            user_id: event.user_id.clone(),
            display_name: Some(event.display_name.clone()),
            is_virtual: Some(event.is_virtual),
            timestamp: event.timestamp.clone(),
        }
    }
}

impl From<&ParticipantUnregisteredEvent> for ParticipantEventPayload {
    fn from(event: &ParticipantUnregisteredEvent) -> Self {
        Self {
            kind: ParticipantEventKind::Unregistered,
            contest_id: event.contest_id.clone(),
            user_id: event.user_id.clone(),
            display_name: None,
            is_virtual: None,
            timestamp: event.timestamp.clone(),
        }
    }
}
