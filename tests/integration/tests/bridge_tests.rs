//! Event Bridge Integration Tests
//!
//! Domain events pushed onto the in-memory event log travel through the bridge,
//! the relay bus, and the hub before reaching sockets.
//!
//! Run with: cargo test -p integration-tests --test bridge_tests

use std::time::Duration;

use integration_tests::{fixtures::*, TestGateway};
use socket_core::DomainTopic;

const QUIET: Duration = Duration::from_millis(300);

#[tokio::test]
async fn test_submission_judged_reaches_owner_and_room() {
    let server = TestGateway::start().await.expect("Failed to start gateway");
    let mut owner = server.connect("u1").await.unwrap();
    let mut watcher = server.connect_to_contest("u2", "c1").await.unwrap();
    let mut outsider = server.connect("u3").await.unwrap();

    server.publish_event(
        DomainTopic::SubmissionJudged,
        &submission_judged("s1", "u1", Some("c1"), "AC"),
    );

    let result = owner.expect("SUBMISSION_RESULT").await.unwrap();
    assert_eq!(result["payload"]["submissionId"], "s1");
    assert_eq!(result["payload"]["verdict"], "AC");
    assert_eq!(result["payload"]["score"], 100);

    let seen = watcher.expect("SUBMISSION_RESULT").await.unwrap();
    assert_eq!(seen["payload"]["userId"], "u1");

    outsider.expect_none("SUBMISSION_RESULT", QUIET).await.unwrap();
    server.wait_committed(DomainTopic::SubmissionJudged, 1).await.unwrap();
}

#[tokio::test]
async fn test_practice_submission_reaches_owner_only() {
    let server = TestGateway::start().await.expect("Failed to start gateway");
    let mut owner = server.connect("u1").await.unwrap();
    let mut watcher = server.connect_to_contest("u2", "c1").await.unwrap();

    server.publish_event(
        DomainTopic::SubmissionCreated,
        &submission_created("s2", "u1", None),
    );

    let created = owner.expect("SUBMISSION_CREATED").await.unwrap();
    assert_eq!(created["payload"]["submissionId"], "s2");
    watcher.expect_none("SUBMISSION_CREATED", QUIET).await.unwrap();
}

#[tokio::test]
async fn test_contest_created_is_broadcast() {
    let server = TestGateway::start().await.expect("Failed to start gateway");
    let mut a = server.connect("u1").await.unwrap();
    let mut b = server.connect_to_contest("u2", "c5").await.unwrap();

    server.publish_event(
        DomainTopic::ContestCreated,
        &contest_created("c42", "Weekly Round"),
    );

    for client in [&mut a, &mut b] {
        let event = client.expect("CONTEST_EVENT").await.unwrap();
        assert_eq!(event["payload"]["type"], "CREATED");
        assert_eq!(event["payload"]["contestId"], "c42");
        assert_eq!(event["payload"]["title"], "Weekly Round");
    }
}

#[tokio::test]
async fn test_contest_started_reaches_room_and_everyone() {
    let server = TestGateway::start().await.expect("Failed to start gateway");
    let mut member = server.connect_to_contest("u1", "c1").await.unwrap();
    let mut other = server.connect("u2").await.unwrap();

    server.publish_event(
        DomainTopic::ContestStarted,
        &contest_started("c1", "Weekly Round"),
    );

    let event = member.expect("CONTEST_EVENT").await.unwrap();
    assert_eq!(event["payload"]["type"], "STARTED");
    let event = other.expect("CONTEST_EVENT").await.unwrap();
    assert_eq!(event["payload"]["type"], "STARTED");
}

#[tokio::test]
async fn test_room_scoped_events_stay_in_room() {
    let server = TestGateway::start().await.expect("Failed to start gateway");
    let mut member = server.connect_to_contest("u1", "c1").await.unwrap();
    let mut other = server.connect_to_contest("u2", "c2").await.unwrap();

    server.publish_event(DomainTopic::LeaderboardUpdated, &leaderboard_updated("c1"));
    server.publish_event(DomainTopic::LeaderboardFrozen, &leaderboard_frozen("c1"));
    server.publish_event(DomainTopic::ProblemAdded, &problem_added("c1", "p7", "G"));
    server.publish_event(
        DomainTopic::ParticipantRegistered,
        &participant_registered("c1", "u9", "Newcomer"),
    );

    let update = member.expect("LEADERBOARD_UPDATE").await.unwrap();
    assert_eq!(update["payload"]["contestId"], "c1");
    member.expect("LEADERBOARD_FROZEN").await.unwrap();

    let added = member.expect("CONTEST_EVENT").await.unwrap();
    assert_eq!(added["payload"]["type"], "PROBLEM_ADDED");
    assert_eq!(added["payload"]["problemId"], "p7");

    let registered = member.expect("PARTICIPANT_EVENT").await.unwrap();
    assert_eq!(registered["payload"]["type"], "REGISTERED");
    assert_eq!(registered["payload"]["userId"], "u9");

    other.expect_none("LEADERBOARD_UPDATE", QUIET).await.unwrap();
}

#[tokio::test]
async fn test_proctoring_violation_is_private() {
    let server = TestGateway::start().await.expect("Failed to start gateway");
    let mut offender = server.connect_to_contest("u3", "c1").await.unwrap();
    let mut peer = server.connect_to_contest("u4", "c1").await.unwrap();

    server.publish_event(
        DomainTopic::ProctoringViolation,
        &proctoring_violation("c1", "u3", "TAB_SWITCH"),
    );

    let violation = offender.expect("PROCTORING_VIOLATION").await.unwrap();
    assert_eq!(violation["payload"]["type"], "TAB_SWITCH");
    assert_eq!(violation["payload"]["totalViolations"], 1);

    peer.expect_none("PROCTORING_VIOLATION", QUIET).await.unwrap();
}

#[tokio::test]
async fn test_bad_records_are_committed_and_skipped() {
    let server = TestGateway::start().await.expect("Failed to start gateway");
    let mut owner = server.connect("u1").await.unwrap();

    server.log.push(DomainTopic::SubmissionJudged.as_str(), "{not json");
    server.publish_event(
        DomainTopic::SubmissionJudged,
        &serde_json::json!({ "verdict": "AC" }),
    );
    server.publish_event(
        DomainTopic::SubmissionJudged,
        &submission_judged("s3", "u1", None, "WA"),
    );

    // The record after the bad ones is still delivered
    let result = owner.expect("SUBMISSION_RESULT").await.unwrap();
    assert_eq!(result["payload"]["submissionId"], "s3");

    server.wait_committed(DomainTopic::SubmissionJudged, 3).await.unwrap();
}
