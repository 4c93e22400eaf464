//! Domain events - bodies of the records published on the event log
//!
//! Field names follow the producers' camelCase JSON exactly. Identifiers needed for
//! routing are required; everything else tolerates absence or `null`. References that
//! may legitimately be missing are `Option` so that absence stays distinguishable from
//! an empty value; plain fields fall back to their default.

use serde::{Deserialize, Deserializer, Serialize};

use crate::value_objects::{RoomId, UserId};

/// Read an explicit `null` as the type's default, the same as an absent field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Resolve an optional contest reference to its room, if it names one
fn optional_contest_room(contest_id: Option<&str>) -> Option<RoomId> {
    contest_id
        .filter(|id| !id.is_empty())
        .and_then(|id| RoomId::contest(id).ok())
}

// =========================================================================
// Submission Events
// =========================================================================

/// `submission.created`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionCreatedEvent {
    pub submission_id: String,
    pub user_id: UserId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub problem_id: String,
    #[serde(default)]
    pub contest_id: Option<String>,
    #[serde(default)]
    pub assignment_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub language: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String,
}

impl SubmissionCreatedEvent {
    /// Contest room this submission belongs to, if any
    #[must_use]
    pub fn contest_room(&self) -> Option<RoomId> {
        optional_contest_room(self.contest_id.as_deref())
    }
}

/// `submission.judged`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionJudgedEvent {
    pub submission_id: String,
    pub user_id: UserId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub problem_id: String,
    #[serde(default)]
    pub contest_id: Option<String>,
    #[serde(default)]
    pub assignment_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub verdict: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub score: i64,
    #[serde(default)]
    pub execution_time_ms: Option<i64>,
    #[serde(default)]
    pub memory_used_kb: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub test_cases_passed: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub test_cases_total: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String,
}

impl SubmissionJudgedEvent {
    /// Contest room this submission belongs to, if any
    #[must_use]
    pub fn contest_room(&self) -> Option<RoomId> {
        optional_contest_room(self.contest_id.as_deref())
    }
}

// =========================================================================
// Leaderboard Events
// =========================================================================

/// `leaderboard.updated`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardUpdatedEvent {
    pub contest_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String,
}

/// `leaderboard.frozen`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardFrozenEvent {
    pub contest_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub freeze_time: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String,
}

/// `leaderboard.unfrozen`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardUnfrozenEvent {
    pub contest_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String,
}

// =========================================================================
// Contest Lifecycle Events
// =========================================================================

/// `contest.created`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContestCreatedEvent {
    pub contest_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub slug: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub visibility: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub scoring_mode: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub start_time: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub end_time: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_by: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String,
}

/// `contest.started`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContestStartedEvent {
    pub contest_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub start_time: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String,
}

/// `contest.ended`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContestEndedEvent {
    pub contest_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub end_time: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String,
}

/// `contest.problem.added`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemAddedEvent {
    pub contest_id: String,
    pub problem_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub label: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String,
}

/// `contest.problem.removed`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemRemovedEvent {
    pub contest_id: String,
    pub problem_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String,
}

// =========================================================================
// Participant Events
// =========================================================================

/// `contest.participant.registered`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantRegisteredEvent {
    pub contest_id: String,
    pub user_id: UserId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_virtual: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String,
}

/// `contest.participant.unregistered`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantUnregisteredEvent {
    pub contest_id: String,
    pub user_id: UserId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String,
}

// =========================================================================
// Proctoring Events
// =========================================================================

/// `proctoring.violation`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProctoringViolationEvent {
    pub contest_id: String,
    pub user_id: UserId,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub violation_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub penalty_applied: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_penalty_minutes: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_violations: i64,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String,
}
