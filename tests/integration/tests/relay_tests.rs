//! Cross-Instance Relay Tests
//!
//! Two gateways share one in-process bus the way separate instances share a
//! Redis relay. Each has its own event log, so a record is handled once.
//!
//! Run with: cargo test -p integration-tests --test relay_tests

use std::time::Duration;

use integration_tests::{fixtures::*, TestGateway, WsClient};
use serde_json::Value;
use socket_core::DomainTopic;
use socket_relay::InMemoryBus;

async fn pair() -> (TestGateway, TestGateway) {
    let bus = InMemoryBus::new();
    let a = TestGateway::start_with_bus(bus.clone(), "gateway-a")
        .await
        .expect("Failed to start gateway a");
    let b = TestGateway::start_with_bus(bus, "gateway-b")
        .await
        .expect("Failed to start gateway b");
    (a, b)
}

/// Next presence update about `user_id`, skipping the client's own
async fn presence_of(client: &mut WsClient, user_id: &str) -> Value {
    loop {
        let update = client.expect("PRESENCE_UPDATE").await.unwrap();
        if update["payload"]["userId"] == user_id {
            return update;
        }
    }
}

#[tokio::test]
async fn test_event_reaches_user_on_other_instance() {
    let (a, b) = pair().await;
    let mut on_b = b.connect("u2").await.unwrap();

    a.publish_event(
        DomainTopic::SubmissionJudged,
        &submission_judged("s1", "u2", None, "AC"),
    );

    let result = on_b.expect("SUBMISSION_RESULT").await.unwrap();
    assert_eq!(result["payload"]["submissionId"], "s1");
    a.wait_committed(DomainTopic::SubmissionJudged, 1).await.unwrap();
    assert!(b.log.committed(DomainTopic::SubmissionJudged.as_str()).is_empty());
}

#[tokio::test]
async fn test_room_spans_instances() {
    let (a, b) = pair().await;
    let mut on_a = a.connect_to_contest("u1", "c1").await.unwrap();
    let mut on_b = b.connect_to_contest("u2", "c1").await.unwrap();
    let mut outsider = a.connect("u3").await.unwrap();

    b.publish_event(DomainTopic::LeaderboardUpdated, &leaderboard_updated("c1"));

    on_a.expect("LEADERBOARD_UPDATE").await.unwrap();
    on_b.expect("LEADERBOARD_UPDATE").await.unwrap();
    outsider
        .expect_none("LEADERBOARD_UPDATE", Duration::from_millis(300))
        .await
        .unwrap();

    // Each instance only counts what it holds
    assert_eq!(a.hub.stats().connections, 2);
    assert_eq!(b.hub.stats().connections, 1);
}

#[tokio::test]
async fn test_presence_crosses_instances() {
    let (a, b) = pair().await;
    let mut on_a = a.connect_to_contest("u1", "c1").await.unwrap();

    let on_b = b.connect_to_contest("u2", "c1").await.unwrap();
    let online = presence_of(&mut on_a, "u2").await;
    assert_eq!(online["payload"]["userId"], "u2");
    assert_eq!(online["payload"]["status"], "online");
    assert_eq!(online["payload"]["roomId"], "contest:c1");

    on_b.close().await.unwrap();
    let offline = presence_of(&mut on_a, "u2").await;
    assert_eq!(offline["payload"]["status"], "offline");
}

#[tokio::test]
async fn test_second_tab_does_not_repeat_presence() {
    let (a, b) = pair().await;
    let mut on_a = a.connect_to_contest("u1", "c1").await.unwrap();

    let _first_tab = b.connect_to_contest("u2", "c1").await.unwrap();
    presence_of(&mut on_a, "u2").await;

    let _second_tab = b.connect_to_contest("u2", "c1").await.unwrap();
    on_a.expect_none("PRESENCE_UPDATE", Duration::from_millis(300))
        .await
        .unwrap();
}
