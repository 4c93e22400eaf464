//! Redis Integration Tests
//!
//! These tests require:
//! - Running Redis instance
//! - Environment variable: REDIS_URL
//!
//! Each test uses its own consumer group and relay channel prefix so runs do
//! not interfere with each other.
//!
//! Run with: cargo test -p integration-tests --test redis_tests

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use integration_tests::{fixtures::*, issue_token, redis_url, test_config, WsClient};
use redis::AsyncCommands;
use serde_json::Value;
use socket_common::AppError;
use socket_core::DomainTopic;
use socket_gateway::{server::bind, Gateway};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct RedisGateway {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), AppError>>,
}

impl RedisGateway {
    async fn start(url: &str, instance_id: &str, run_id: &str) -> Result<Self> {
        let group = format!("it-group-{run_id}");
        let prefix = format!("it-{run_id}");
        let config = test_config(
            instance_id,
            &[
                ("REDIS_URL", url),
                ("EVENT_LOG_CONSUMER_GROUP", group.as_str()),
                ("RELAY_CHANNEL_PREFIX", prefix.as_str()),
                ("EVENT_LOG_BLOCK_MS", "200"),
            ],
        )?;

        let gateway = Gateway::connect(&config).await?;
        let listener = bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown, stopped) = oneshot::channel::<()>();
        let handle = tokio::spawn(gateway.serve(listener, async move {
            let _ = stopped.await;
        }));

        let client = reqwest::Client::new();
        for _ in 0..50 {
            if let Ok(response) = client.get(format!("http://{addr}/health")).send().await {
                if response.status().is_success() {
                    return Ok(Self {
                        addr,
                        shutdown,
                        handle,
                    });
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        anyhow::bail!("Gateway on {} never became ready", addr)
    }

    async fn connect(&self, user_id: &str) -> Result<WsClient> {
        let token = issue_token(user_id)?;
        let mut client = WsClient::connect(&format!("ws://{}/ws?token={}", self.addr, token)).await?;
        client.expect("CONNECTED").await?;
        Ok(client)
    }

    async fn stop(self) -> Result<()> {
        let _ = self.shutdown.send(());
        self.handle.await??;
        Ok(())
    }
}

fn run_id() -> String {
    format!(
        "{}-{}",
        std::process::id(),
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    )
}

async fn xadd(url: &str, topic: DomainTopic, body: &Value) -> Result<String> {
    let client = redis::Client::open(url)?;
    let mut conn = client.get_multiplexed_async_connection().await?;
    let id: String = conn
        .xadd(topic.as_str(), "*", &[("value", body.to_string())])
        .await?;
    Ok(id)
}

#[tokio::test]
async fn test_stream_record_reaches_socket() {
    let Some(url) = redis_url() else {
        return;
    };
    let run = run_id();
    let gateway = RedisGateway::start(&url, "redis-a", &run)
        .await
        .expect("Failed to start gateway");

    let user = format!("user-{run}");
    let submission = format!("sub-{run}");
    let mut client = gateway.connect(&user).await.unwrap();

    xadd(
        &url,
        DomainTopic::SubmissionJudged,
        &submission_judged(&submission, &user, None, "AC"),
    )
    .await
    .unwrap();

    let result = client.expect("SUBMISSION_RESULT").await.unwrap();
    assert_eq!(result["payload"]["submissionId"], submission.as_str());

    gateway.stop().await.unwrap();
}

#[tokio::test]
async fn test_redis_relay_spans_instances() {
    let Some(url) = redis_url() else {
        return;
    };
    let run = run_id();
    let a = RedisGateway::start(&url, "redis-a", &run)
        .await
        .expect("Failed to start gateway a");
    let b = RedisGateway::start(&url, "redis-b", &run)
        .await
        .expect("Failed to start gateway b");

    let contest = format!("c-{run}");
    let mut on_a = a.connect("u1").await.unwrap();
    on_a.join(&contest).await.unwrap();
    let mut on_b = b.connect("u2").await.unwrap();
    on_b.join(&contest).await.unwrap();

    // Whichever instance reads the record, both rooms receive it
    xadd(&url, DomainTopic::LeaderboardUpdated, &leaderboard_updated(&contest))
        .await
        .unwrap();

    for client in [&mut on_a, &mut on_b] {
        let update = client.expect("LEADERBOARD_UPDATE").await.unwrap();
        assert_eq!(update["payload"]["contestId"], contest.as_str());
    }

    a.stop().await.unwrap();
    b.stop().await.unwrap();
}
