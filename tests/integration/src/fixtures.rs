//! Test fixtures for integration tests
//!
//! Domain event bodies as upstream services produce them.

use serde_json::{json, Value};

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// `submission.created`
pub fn submission_created(submission_id: &str, user_id: &str, contest_id: Option<&str>) -> Value {
    json!({
        "submissionId": submission_id,
        "userId": user_id,
        "problemId": "p1",
        "contestId": contest_id,
        "language": "rust",
        "status": "PENDING",
        "timestamp": now(),
    })
}

/// `submission.judged`
pub fn submission_judged(
    submission_id: &str,
    user_id: &str,
    contest_id: Option<&str>,
    verdict: &str,
) -> Value {
    json!({
        "submissionId": submission_id,
        "userId": user_id,
        "problemId": "p1",
        "contestId": contest_id,
        "verdict": verdict,
        "score": if verdict == "AC" { 100 } else { 0 },
        "executionTimeMs": 42,
        "memoryUsedKb": 2048,
        "testCasesPassed": 10,
        "testCasesTotal": 10,
        "timestamp": now(),
    })
}

/// `leaderboard.updated`
pub fn leaderboard_updated(contest_id: &str) -> Value {
    json!({ "contestId": contest_id, "timestamp": now() })
}

/// `leaderboard.frozen`
pub fn leaderboard_frozen(contest_id: &str) -> Value {
    json!({ "contestId": contest_id, "freezeTime": now(), "timestamp": now() })
}

/// `contest.created`
pub fn contest_created(contest_id: &str, title: &str) -> Value {
    json!({
        "contestId": contest_id,
        "title": title,
        "slug": title.to_lowercase().replace(' ', "-"),
        "visibility": "PUBLIC",
        "scoringMode": "ICPC",
        "startTime": now(),
        "endTime": now(),
        "createdBy": "admin",
        "timestamp": now(),
    })
}

/// `contest.started`
pub fn contest_started(contest_id: &str, title: &str) -> Value {
    json!({ "contestId": contest_id, "title": title, "startTime": now(), "timestamp": now() })
}

/// `contest.problem.added`
pub fn problem_added(contest_id: &str, problem_id: &str, label: &str) -> Value {
    json!({
        "contestId": contest_id,
        "problemId": problem_id,
        "label": label,
        "timestamp": now(),
    })
}

/// `contest.participant.registered`
pub fn participant_registered(contest_id: &str, user_id: &str, display_name: &str) -> Value {
    json!({
        "contestId": contest_id,
        "userId": user_id,
        "displayName": display_name,
        "isVirtual": false,
        "timestamp": now(),
    })
}

/// `proctoring.violation`
pub fn proctoring_violation(contest_id: &str, user_id: &str, violation_type: &str) -> Value {
    json!({
        "contestId": contest_id,
        "userId": user_id,
        "type": violation_type,
        "penaltyApplied": 5,
        "totalPenaltyMinutes": 5,
        "totalViolations": 1,
        "details": "Window lost focus",
        "timestamp": now(),
    })
}
