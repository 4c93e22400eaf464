//! Server message payloads derived from domain events
//!
//! Submission, leaderboard, and proctoring messages carry the domain event body
//! unchanged. Contest and participant messages wrap theirs with a `type` tag.

mod payloads;

pub use payloads::{
    ContestEventKind, ContestEventPayload, ParticipantEventKind, ParticipantEventPayload,
};
