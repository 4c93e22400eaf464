//! Event log topics

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

/// Topics carrying domain events the socket service reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DomainTopic {
    #[serde(rename = "submission.created")]
    SubmissionCreated,
    #[serde(rename = "submission.judged")]
    SubmissionJudged,
    #[serde(rename = "leaderboard.updated")]
    LeaderboardUpdated,
    #[serde(rename = "leaderboard.frozen")]
    LeaderboardFrozen,
    #[serde(rename = "leaderboard.unfrozen")]
    LeaderboardUnfrozen,
    #[serde(rename = "contest.created")]
    ContestCreated,
    #[serde(rename = "contest.started")]
    ContestStarted,
    #[serde(rename = "contest.ended")]
    ContestEnded,
    #[serde(rename = "contest.participant.registered")]
    ParticipantRegistered,
    #[serde(rename = "contest.participant.unregistered")]
    ParticipantUnregistered,
    #[serde(rename = "contest.problem.added")]
    ProblemAdded,
    #[serde(rename = "contest.problem.removed")]
    ProblemRemoved,
    #[serde(rename = "proctoring.violation")]
    ProctoringViolation,
}

impl DomainTopic {
    /// Every topic the service knows how to handle
    pub const ALL: [Self; 13] = [
        Self::SubmissionCreated,
        Self::SubmissionJudged,
        Self::LeaderboardUpdated,
        Self::LeaderboardFrozen,
        Self::LeaderboardUnfrozen,
        Self::ContestCreated,
        Self::ContestStarted,
        Self::ContestEnded,
        Self::ParticipantRegistered,
        Self::ParticipantUnregistered,
        Self::ProblemAdded,
        Self::ProblemRemoved,
        Self::ProctoringViolation,
    ];

    /// Topics consumed when none are configured explicitly
    pub const DEFAULT_SUBSCRIPTIONS: [Self; 10] = [
        Self::SubmissionCreated,
        Self::SubmissionJudged,
        Self::LeaderboardUpdated,
        Self::LeaderboardFrozen,
        Self::LeaderboardUnfrozen,
        Self::ContestCreated,
        Self::ContestStarted,
        Self::ContestEnded,
        Self::ParticipantRegistered,
        Self::ProctoringViolation,
    ];

    /// Get the topic name as it appears on the event log
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SubmissionCreated => "submission.created",
            Self::SubmissionJudged => "submission.judged",
            Self::LeaderboardUpdated => "leaderboard.updated",
            Self::LeaderboardFrozen => "leaderboard.frozen",
            Self::LeaderboardUnfrozen => "leaderboard.unfrozen",
            Self::ContestCreated => "contest.created",
            Self::ContestStarted => "contest.started",
            Self::ContestEnded => "contest.ended",
            Self::ParticipantRegistered => "contest.participant.registered",
            Self::ParticipantUnregistered => "contest.participant.unregistered",
            Self::ProblemAdded => "contest.problem.added",
            Self::ProblemRemoved => "contest.problem.removed",
            Self::ProctoringViolation => "proctoring.violation",
        }
    }
}

impl fmt::Display for DomainTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DomainTopic {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|topic| topic.as_str() == s)
            .ok_or_else(|| DomainError::UnknownTopic(s.to_string()))
    }
}
