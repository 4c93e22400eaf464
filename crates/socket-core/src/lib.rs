//! # socket-core
//!
//! Domain layer for the contest socket service: identifiers, room ids, delivery
//! targets, and the domain events consumed from the event log.
//! This crate has no dependencies on infrastructure (Redis, web framework, etc.).

pub mod error;
pub mod events;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use error::DomainError;
pub use events::{
    ContestCreatedEvent, ContestEndedEvent, ContestStartedEvent, DomainTopic,
    LeaderboardFrozenEvent, LeaderboardUnfrozenEvent, LeaderboardUpdatedEvent,
    ParticipantRegisteredEvent, ParticipantUnregisteredEvent, ProblemAddedEvent,
    ProblemRemovedEvent, ProctoringViolationEvent, SubmissionCreatedEvent, SubmissionJudgedEvent,
};
pub use value_objects::{ConnectionId, DeliveryTarget, RoomId, RoomType, UserId};
