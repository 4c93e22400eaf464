//! Gateway Integration Tests
//!
//! Runs gateways in-process on ephemeral ports with the in-memory relay and
//! event log; no external services are needed.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::sync::Arc;
use std::time::Duration;

use integration_tests::{
    assert_json, assert_status, issue_token, test_config, TestGateway, WsClient,
};
use reqwest::StatusCode;
use serde_json::{json, Value};
use socket_relay::InMemoryBus;

// ============================================================================
// HTTP Endpoint Tests
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = TestGateway::start().await.expect("Failed to start gateway");
    let response = server.get("/health").await.expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_stats_counts_local_connections() {
    let server = TestGateway::start().await.expect("Failed to start gateway");

    let stats: Value = assert_json(server.get("/stats").await.unwrap(), StatusCode::OK)
        .await
        .unwrap();
    assert_eq!(stats["instanceId"], "it-gateway");
    assert_eq!(stats["connections"], 0);
    assert_eq!(stats["busConnected"], true);

    let _first = server.connect_to_contest("u1", "c1").await.unwrap();
    let _second = server.connect("u1").await.unwrap();
    let _third = server.connect("u2").await.unwrap();

    let stats: Value = assert_json(server.get("/stats").await.unwrap(), StatusCode::OK)
        .await
        .unwrap();
    assert_eq!(stats["connections"], 3);
    assert_eq!(stats["users"], 2);
    assert_eq!(stats["rooms"], 1);
}

// ============================================================================
// Handshake Tests
// ============================================================================

#[tokio::test]
async fn test_handshake_without_token_is_rejected() {
    let server = TestGateway::start().await.expect("Failed to start gateway");

    let response = server.get("/ws").await.unwrap();
    let body: Value = assert_json(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert!(body["code"].is_string());

    let result = WsClient::connect(&server.ws_url(None)).await;
    assert!(result.is_err());
    assert_eq!(server.hub.stats().connections, 0);
}

#[tokio::test]
async fn test_handshake_with_invalid_token_is_rejected() {
    let server = TestGateway::start().await.expect("Failed to start gateway");

    let response = server.get("/ws?token=not-a-jwt").await.unwrap();
    assert_status(response, StatusCode::UNAUTHORIZED).await.unwrap();

    let foreign = socket_common::JwtService::new("some-other-secret")
        .issue(&"u1".into(), None, chrono::Duration::minutes(5))
        .unwrap();
    let result = WsClient::connect(&server.ws_url(Some(&foreign))).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_plain_request_with_token_requires_upgrade() {
    let server = TestGateway::start().await.expect("Failed to start gateway");
    let token = issue_token("u1").unwrap();

    let response = server.get(&format!("/ws?token={token}")).await.unwrap();
    assert_status(response, StatusCode::UPGRADE_REQUIRED).await.unwrap();
}

#[tokio::test]
async fn test_connected_greeting() {
    let server = TestGateway::start().await.expect("Failed to start gateway");
    let token = issue_token("u7").unwrap();

    let mut client = WsClient::connect(&server.ws_url(Some(&token))).await.unwrap();
    let connected = client.recv().await.unwrap();

    assert_eq!(connected["type"], "CONNECTED");
    assert_eq!(connected["payload"]["userId"], "u7");
    assert_eq!(connected["payload"]["instanceId"], "it-gateway");
    assert!(connected["timestamp"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_bearer_header_authenticates() {
    let server = TestGateway::start().await.expect("Failed to start gateway");
    let token = issue_token("u8").unwrap();

    let mut client = WsClient::connect_with_bearer(&server.ws_url(None), &token)
        .await
        .unwrap();
    let connected = client.expect("CONNECTED").await.unwrap();
    assert_eq!(connected["payload"]["userId"], "u8");
}

// ============================================================================
// Control Message Tests
// ============================================================================

#[tokio::test]
async fn test_join_and_leave_room() {
    let server = TestGateway::start().await.expect("Failed to start gateway");
    let mut client = server.connect("u1").await.unwrap();

    client
        .send("JOIN_ROOM", Some(json!({ "roomId": "contest:c1" })), Some("r-1"))
        .await
        .unwrap();
    let joined = client.expect("ROOM_JOINED").await.unwrap();
    assert_eq!(joined["payload"]["roomId"], "contest:c1");
    assert_eq!(joined["payload"]["memberCount"], 1);
    assert_eq!(joined["requestId"], "r-1");
    assert_eq!(server.hub.registry().room_member_count(&"contest:c1".parse().unwrap()), 1);

    client
        .send("LEAVE_ROOM", Some(json!({ "roomId": "contest:c1" })), Some("r-2"))
        .await
        .unwrap();
    let left = client.expect("ROOM_LEFT").await.unwrap();
    assert_eq!(left["payload"]["roomId"], "contest:c1");
    assert_eq!(left["requestId"], "r-2");
    assert_eq!(server.hub.stats().rooms, 0);
}

#[tokio::test]
async fn test_subscribe_aliases() {
    let server = TestGateway::start().await.expect("Failed to start gateway");
    let mut client = server.connect("u1").await.unwrap();

    client
        .send("SUBSCRIBE", Some(json!({ "roomId": "contest:c9" })), None)
        .await
        .unwrap();
    client.expect("ROOM_JOINED").await.unwrap();

    client
        .send("UNSUBSCRIBE", Some(json!({ "roomId": "contest:c9" })), None)
        .await
        .unwrap();
    client.expect("ROOM_LEFT").await.unwrap();
}

#[tokio::test]
async fn test_rejoin_sends_no_second_ack() {
    let server = TestGateway::start().await.expect("Failed to start gateway");
    let mut client = server.connect_to_contest("u1", "c1").await.unwrap();

    client
        .send("JOIN_ROOM", Some(json!({ "roomId": "contest:c1" })), None)
        .await
        .unwrap();
    client
        .expect_none("ROOM_JOINED", Duration::from_millis(300))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_ping_pong_echoes_request_id() {
    let server = TestGateway::start().await.expect("Failed to start gateway");
    let mut client = server.connect("u1").await.unwrap();

    client.send("PING", None, Some("hb-42")).await.unwrap();
    let pong = client.expect("PONG").await.unwrap();
    assert_eq!(pong["requestId"], "hb-42");
}

#[tokio::test]
async fn test_malformed_frame_keeps_connection_open() {
    let server = TestGateway::start().await.expect("Failed to start gateway");
    let mut client = server.connect("u1").await.unwrap();

    client.send_text("{not json").await.unwrap();
    let error = client.expect("ERROR").await.unwrap();
    assert_eq!(error["payload"]["code"], "INVALID_MESSAGE");

    // Still usable afterwards
    client.send("PING", None, None).await.unwrap();
    client.expect("PONG").await.unwrap();
}

#[tokio::test]
async fn test_invalid_room_id_is_reported() {
    let server = TestGateway::start().await.expect("Failed to start gateway");
    let mut client = server.connect("u1").await.unwrap();

    client
        .send("JOIN_ROOM", Some(json!({ "roomId": "lobby" })), Some("bad"))
        .await
        .unwrap();
    let error = client.expect("ERROR").await.unwrap();
    assert_eq!(error["payload"]["code"], "INVALID_ROOM_ID");
    assert_eq!(error["requestId"], "bad");

    client
        .send("JOIN_ROOM", Some(json!({ "room": "contest:c1" })), None)
        .await
        .unwrap();
    let error = client.expect("ERROR").await.unwrap();
    assert_eq!(error["payload"]["code"], "INVALID_PAYLOAD");
}

#[tokio::test]
async fn test_unknown_types_are_ignored() {
    let server = TestGateway::start().await.expect("Failed to start gateway");
    let mut client = server.connect("u1").await.unwrap();

    client.send("TYPING", Some(json!({})), None).await.unwrap();
    client.send("SUBMISSION_RESULT", Some(json!({})), None).await.unwrap();
    client.expect_none("ERROR", Duration::from_millis(300)).await.unwrap();

    client.send("PING", None, None).await.unwrap();
    client.expect("PONG").await.unwrap();
}

// ============================================================================
// Lifecycle Tests
// ============================================================================

#[tokio::test]
async fn test_client_close_removes_connection() {
    let server = TestGateway::start().await.expect("Failed to start gateway");
    let client = server.connect_to_contest("u1", "c1").await.unwrap();
    assert_eq!(server.hub.stats().connections, 1);

    client.close().await.unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while server.hub.stats().connections > 0 {
        assert!(tokio::time::Instant::now() < deadline, "connection was never removed");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(server.hub.stats().rooms, 0);
}

#[tokio::test]
async fn test_silent_client_times_out() {
    let config = test_config(
        "it-heartbeat",
        &[
            ("HEARTBEAT_INTERVAL_MS", "100"),
            ("HEARTBEAT_TIMEOUT_MULTIPLIER", "2"),
        ],
    )
    .unwrap();
    let server = TestGateway::start_with_config(config, Arc::new(InMemoryBus::new()))
        .await
        .expect("Failed to start gateway");
    let mut client = server.connect("u1").await.unwrap();

    // Not polling the socket means pings go unanswered
    tokio::time::sleep(Duration::from_millis(600)).await;

    let code = client.expect_close(Duration::from_secs(5)).await.unwrap();
    assert_eq!(code, 4009);
}

#[tokio::test]
async fn test_shutdown_closes_connections() {
    let server = TestGateway::start().await.expect("Failed to start gateway");
    let mut client = server.connect_to_contest("u1", "c1").await.unwrap();
    let hub = server.hub.clone();

    let stopping = tokio::spawn(server.shutdown());

    let code = client.expect_close(Duration::from_secs(5)).await.unwrap();
    assert_eq!(code, 4010);

    stopping.await.unwrap().unwrap();
    assert!(!hub.is_running());
}
