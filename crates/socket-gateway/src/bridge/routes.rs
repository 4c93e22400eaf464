//! Topic handlers
//!
//! Each topic has one handler that decodes the record body into its domain event
//! and turns it into the deliveries to publish. The mapping is fixed when the
//! registry is built.

use serde::de::DeserializeOwned;
use serde::Serialize;
use socket_core::{
    ContestCreatedEvent, ContestEndedEvent, ContestStartedEvent, DeliveryTarget, DomainTopic,
    LeaderboardFrozenEvent, LeaderboardUnfrozenEvent, LeaderboardUpdatedEvent,
    ParticipantRegisteredEvent, ParticipantUnregisteredEvent, ProblemAddedEvent,
    ProblemRemovedEvent, ProctoringViolationEvent, RoomId, SubmissionCreatedEvent,
    SubmissionJudgedEvent, UserId,
};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use super::{BridgeError, BridgeResult};
use crate::events::{ContestEventPayload, ParticipantEventPayload};
use crate::protocol::{Envelope, MessageType};

/// One envelope to publish to one target
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub target: DeliveryTarget,
    pub envelope: Envelope,
}

impl Delivery {
    #[must_use]
    pub fn new(target: DeliveryTarget, envelope: Envelope) -> Self {
        Self { target, envelope }
    }
}

/// Turns a raw record body into deliveries
pub trait TopicHandler: Send + Sync {
    /// Decode and route one record body
    fn route(&self, body: &[u8]) -> BridgeResult<Vec<Delivery>>;
}

/// Handler that decodes into a typed event before routing it
struct TypedHandler<E, F> {
    topic: DomainTopic,
    route: F,
    _event: PhantomData<fn() -> E>,
}

impl<E, F> TopicHandler for TypedHandler<E, F>
where
    E: DeserializeOwned,
    F: Fn(&E) -> BridgeResult<Vec<Delivery>> + Send + Sync,
{
    fn route(&self, body: &[u8]) -> BridgeResult<Vec<Delivery>> {
        let event: E = serde_json::from_slice(body).map_err(|source| BridgeError::Decode {
            topic: self.topic.to_string(),
            source,
        })?;
        (self.route)(&event)
    }
}

/// Topic to handler mapping
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<DomainTopic, Arc<dyn TopicHandler>>,
}

impl HandlerRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with a handler for every known topic
    #[must_use]
    pub fn standard() -> Self {
        Self::new()
            .on(DomainTopic::SubmissionCreated, submission_created)
            .on(DomainTopic::SubmissionJudged, submission_judged)
            .on(DomainTopic::LeaderboardUpdated, leaderboard_updated)
            .on(DomainTopic::LeaderboardFrozen, leaderboard_frozen)
            .on(DomainTopic::LeaderboardUnfrozen, leaderboard_unfrozen)
            .on(DomainTopic::ContestCreated, contest_created)
            .on(DomainTopic::ContestStarted, contest_started)
            .on(DomainTopic::ContestEnded, contest_ended)
            .on(DomainTopic::ProblemAdded, problem_added)
            .on(DomainTopic::ProblemRemoved, problem_removed)
            .on(DomainTopic::ParticipantRegistered, participant_registered)
            .on(DomainTopic::ParticipantUnregistered, participant_unregistered)
            .on(DomainTopic::ProctoringViolation, proctoring_violation)
    }

    /// Register a typed handler for a topic, replacing any previous one
    #[must_use]
    pub fn on<E, F>(mut self, topic: DomainTopic, route: F) -> Self
    where
        E: DeserializeOwned + 'static,
        F: Fn(&E) -> BridgeResult<Vec<Delivery>> + Send + Sync + 'static,
    {
        self.handlers.insert(
            topic,
            Arc::new(TypedHandler {
                topic,
                route,
                _event: PhantomData,
            }),
        );
        self
    }

    /// Register an untyped handler for a topic
    #[must_use]
    pub fn with_handler(mut self, topic: DomainTopic, handler: Arc<dyn TopicHandler>) -> Self {
        self.handlers.insert(topic, handler);
        self
    }

    pub fn get(&self, topic: DomainTopic) -> Option<Arc<dyn TopicHandler>> {
        self.handlers.get(&topic).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Resolve configured topic names to their handlers
    ///
    /// Any name that is not a known topic, or has no handler, fails the whole
    /// resolution.
    pub fn resolve(
        &self,
        topics: &[String],
    ) -> BridgeResult<Vec<(DomainTopic, Arc<dyn TopicHandler>)>> {
        topics
            .iter()
            .map(|name| {
                let topic: DomainTopic = name
                    .parse()
                    .map_err(|_| BridgeError::Unregistered(name.clone()))?;
                let handler = self
                    .get(topic)
                    .ok_or_else(|| BridgeError::Unregistered(name.clone()))?;
                Ok((topic, handler))
            })
            .collect()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut topics: Vec<_> = self.handlers.keys().map(|t| t.as_str()).collect();
        topics.sort_unstable();
        f.debug_struct("HandlerRegistry")
            .field("topics", &topics)
            .finish()
    }
}

// =========================================================================
// Routing
// =========================================================================

fn deliver_to<P: Serialize>(
    targets: impl IntoIterator<Item = DeliveryTarget>,
    message_type: MessageType,
    payload: &P,
) -> BridgeResult<Vec<Delivery>> {
    let envelope = Envelope::build(message_type, payload)?;
    Ok(targets
        .into_iter()
        .map(|target| Delivery::new(target, envelope.clone()))
        .collect())
}

fn contest_room(contest_id: &str) -> BridgeResult<DeliveryTarget> {
    Ok(DeliveryTarget::Room(RoomId::contest(contest_id)?))
}

/// The submitter, plus the contest room when the submission belongs to one
fn submission_targets(user: &UserId, room: Option<RoomId>) -> Vec<DeliveryTarget> {
    let mut targets = vec![DeliveryTarget::User(user.clone())];
    targets.extend(room.map(DeliveryTarget::Room));
    targets
}

fn submission_created(event: &SubmissionCreatedEvent) -> BridgeResult<Vec<Delivery>> {
    deliver_to(
        submission_targets(&event.user_id, event.contest_room()),
        MessageType::SubmissionCreated,
        event,
    )
}

fn submission_judged(event: &SubmissionJudgedEvent) -> BridgeResult<Vec<Delivery>> {
    deliver_to(
        submission_targets(&event.user_id, event.contest_room()),
        MessageType::SubmissionResult,
        event,
    )
}

fn leaderboard_updated(event: &LeaderboardUpdatedEvent) -> BridgeResult<Vec<Delivery>> {
    deliver_to(
        [contest_room(&event.contest_id)?],
        MessageType::LeaderboardUpdate,
        event,
    )
}

fn leaderboard_frozen(event: &LeaderboardFrozenEvent) -> BridgeResult<Vec<Delivery>> {
    deliver_to(
        [contest_room(&event.contest_id)?],
        MessageType::LeaderboardFrozen,
        event,
    )
}

fn leaderboard_unfrozen(event: &LeaderboardUnfrozenEvent) -> BridgeResult<Vec<Delivery>> {
    deliver_to(
        [contest_room(&event.contest_id)?],
        MessageType::LeaderboardUnfrozen,
        event,
    )
}

fn contest_created(event: &ContestCreatedEvent) -> BridgeResult<Vec<Delivery>> {
    deliver_to(
        [DeliveryTarget::All],
        MessageType::ContestEvent,
        &ContestEventPayload::from(event),
    )
}

fn contest_started(event: &ContestStartedEvent) -> BridgeResult<Vec<Delivery>> {
    deliver_to(
        [contest_room(&event.contest_id)?, DeliveryTarget::All],
        MessageType::ContestEvent,
        &ContestEventPayload::from(event),
    )
}

fn contest_ended(event: &ContestEndedEvent) -> BridgeResult<Vec<Delivery>> {
    deliver_to(
        [contest_room(&event.contest_id)?],
        MessageType::ContestEvent,
        &ContestEventPayload::from(event),
    )
}

fn problem_added(event: &ProblemAddedEvent) -> BridgeResult<Vec<Delivery>> {
    deliver_to(
        [contest_room(&event.contest_id)?],
        MessageType::ContestEvent,
        &ContestEventPayload::from(event),
    )
}

fn problem_removed(event: &ProblemRemovedEvent) -> BridgeResult<Vec<Delivery>> {
    deliver_to(
        [contest_room(&event.contest_id)?],
        MessageType::ContestEvent,
        &ContestEventPayload::from(event),
    )
}

fn participant_registered(event: &ParticipantRegisteredEvent) -> BridgeResult<Vec<Delivery>> {
    deliver_to(
        [contest_room(&event.contest_id)?],
        MessageType::ParticipantEvent,
        &ParticipantEventPayload::from(event),
    )
}

fn participant_unregistered(event: &ParticipantUnregisteredEvent) -> BridgeResult<Vec<Delivery>> {
    deliver_to(
        [contest_room(&event.contest_id)?],
        MessageType::ParticipantEvent,
        &ParticipantEventPayload::from(event),
    )
}

// Violations are private to the user; never sent to the room.
fn proctoring_violation(event: &ProctoringViolationEvent) -> BridgeResult<Vec<Delivery>> {
    deliver_to(
        [DeliveryTarget::User(event.user_id.clone())],
        MessageType::ProctoringViolation,
        event,
    )
}
