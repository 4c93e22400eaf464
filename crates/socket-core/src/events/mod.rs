//! Domain events consumed from the event log and the topics they arrive on

mod domain_event;
mod topic;

pub use domain_event::{
    ContestCreatedEvent, ContestEndedEvent, ContestStartedEvent, LeaderboardFrozenEvent,
    LeaderboardUnfrozenEvent, LeaderboardUpdatedEvent, ParticipantRegisteredEvent,
    ParticipantUnregisteredEvent, ProblemAddedEvent, ProblemRemovedEvent,
    ProctoringViolationEvent, SubmissionCreatedEvent, SubmissionJudgedEvent,
};
pub use topic::DomainTopic;
