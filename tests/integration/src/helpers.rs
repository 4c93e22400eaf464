//! Test helpers for integration tests
//!
//! Provides utilities for spawning gateways in-process, making HTTP requests,
//! and driving WebSocket clients.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use socket_common::{AppConfig, AppError, JwtService};
use socket_core::{DomainTopic, UserId};
use socket_gateway::hub::Hub;
use socket_gateway::Gateway;
use socket_relay::{InMemoryBus, MemoryEventLog, SharedBus};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// Secret shared by test gateways and the tokens issued for them
pub const TEST_JWT_SECRET: &str = "integration-test-secret";

/// Default wait for an expected frame
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Build a configuration from defaults plus `overrides`
///
/// Every known topic is consumed unless `EVENT_LOG_TOPICS` is overridden.
pub fn test_config(instance_id: &str, overrides: &[(&str, &str)]) -> Result<AppConfig> {
    let topics = DomainTopic::ALL
        .iter()
        .map(|topic| topic.as_str())
        .collect::<Vec<_>>()
        .join(",");

    let mut vars: Vec<(String, String)> = vec![
        ("REDIS_URL".into(), "redis://127.0.0.1:6379".into()),
        ("JWT_SECRET".into(), TEST_JWT_SECRET.into()),
        ("INSTANCE_ID".into(), instance_id.into()),
        ("EVENT_LOG_TOPICS".into(), topics),
        ("SHUTDOWN_TIMEOUT_MS".into(), "1000".into()),
    ];
    for (key, value) in overrides {
        vars.retain(|(k, _)| k != key);
        vars.push(((*key).to_string(), (*value).to_string()));
    }

    AppConfig::from_lookup(|key| {
        vars.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    })
    .map_err(|e| anyhow::anyhow!("Config error: {}", e))
}

/// Issue a token for `user_id` signed with the test secret
pub fn issue_token(user_id: &str) -> Result<String> {
    JwtService::new(TEST_JWT_SECRET)
        .issue(
            &UserId::from(user_id),
            Some(format!("{user_id}-name")),
            chrono::Duration::minutes(10),
        )
        .map_err(|e| anyhow::anyhow!("Token error: {}", e))
}

/// A gateway serving on an ephemeral port with in-memory relay and event log
pub struct TestGateway {
    pub addr: SocketAddr,
    pub client: Client,
    pub hub: Arc<Hub>,
    pub log: Arc<MemoryEventLog>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<(), AppError>>,
}

impl TestGateway {
    /// Start a gateway on its own bus
    pub async fn start() -> Result<Self> {
        Self::start_with_bus(InMemoryBus::new(), "it-gateway").await
    }

    /// Start a gateway sharing `bus` with other gateways in this process
    pub async fn start_with_bus(bus: InMemoryBus, instance_id: &str) -> Result<Self> {
        Self::start_with_config(test_config(instance_id, &[])?, Arc::new(bus)).await
    }

    /// Start a gateway with custom config
    pub async fn start_with_config(config: AppConfig, bus: SharedBus) -> Result<Self> {
        let log = Arc::new(MemoryEventLog::new());
        let gateway = Gateway::with_parts(&config, bus, log.clone())?;
        let hub = gateway.hub().clone();

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown, stopped) = oneshot::channel::<()>();
        let handle = tokio::spawn(gateway.serve(listener, async move {
            let _ = stopped.await;
        }));

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        let server = Self {
            addr,
            client,
            hub,
            log,
            shutdown: Some(shutdown),
            handle,
        };
        server.wait_ready().await?;
        Ok(server)
    }

    /// Wait until the HTTP side answers; by then the hub and bridge are running
    async fn wait_ready(&self) -> Result<()> {
        for _ in 0..50 {
            if let Ok(response) = self.get("/health").await {
                if response.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        anyhow::bail!("Gateway on {} never became ready", self.addr)
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// WebSocket URL, with the token in the query when given
    pub fn ws_url(&self, token: Option<&str>) -> String {
        match token {
            Some(token) => format!("ws://{}/ws?token={}", self.addr, token),
            None => format!("ws://{}/ws", self.addr),
        }
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// Connect a socket as `user_id`, consuming the CONNECTED greeting
    pub async fn connect(&self, user_id: &str) -> Result<WsClient> {
        let token = issue_token(user_id)?;
        let mut client = WsClient::connect(&self.ws_url(Some(&token))).await?;
        client.expect("CONNECTED").await?;
        Ok(client)
    }

    /// Connect a socket as `user_id` and join `contest:<contest_id>`
    pub async fn connect_to_contest(&self, user_id: &str, contest_id: &str) -> Result<WsClient> {
        let mut client = self.connect(user_id).await?;
        client.join(contest_id).await?;
        Ok(client)
    }

    /// Append a domain event to the gateway's event log
    pub fn publish_event(&self, topic: DomainTopic, body: &Value) -> String {
        self.log.push(topic.as_str(), body.to_string())
    }

    /// Wait until every record pushed on `topic` has been committed
    pub async fn wait_committed(&self, topic: DomainTopic, count: usize) -> Result<()> {
        let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
        while self.log.committed(topic.as_str()).len() < count {
            if tokio::time::Instant::now() >= deadline {
                anyhow::bail!("Records on {} were not committed in time", topic);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        Ok(())
    }

    /// Trigger graceful shutdown and wait for the server to finish
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        tokio::time::timeout(Duration::from_secs(10), &mut self.handle)
            .await
            .context("Gateway did not shut down in time")???;
        Ok(())
    }
}

/// A WebSocket test client speaking the envelope protocol
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    /// Open a socket to `url`
    pub async fn connect(url: &str) -> Result<Self> {
        let (stream, _) = tokio_tungstenite::connect_async(url).await?;
        Ok(Self { stream })
    }

    /// Open a socket to `url`, authenticating with an `Authorization` header
    pub async fn connect_with_bearer(url: &str, token: &str) -> Result<Self> {
        let mut request = url.into_client_request()?;
        request
            .headers_mut()
            .insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);
        let (stream, _) = tokio_tungstenite::connect_async(request).await?;
        Ok(Self { stream })
    }

    /// Send a raw text frame
    pub async fn send_text(&mut self, text: impl Into<String>) -> Result<()> {
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    /// Send an envelope
    pub async fn send(&mut self, message_type: &str, payload: Option<Value>, request_id: Option<&str>) -> Result<()> {
        let mut envelope = json!({
            "type": message_type,
            "timestamp": chrono::Utc::now().timestamp_millis(),
        });
        if let Some(payload) = payload {
            envelope["payload"] = payload;
        }
        if let Some(request_id) = request_id {
            envelope["requestId"] = json!(request_id);
        }
        self.send_text(envelope.to_string()).await
    }

    /// Join `contest:<contest_id>` and wait for the acknowledgement
    pub async fn join(&mut self, contest_id: &str) -> Result<Value> {
        let room_id = format!("contest:{contest_id}");
        self.send("JOIN_ROOM", Some(json!({ "roomId": room_id })), None)
            .await?;
        self.expect("ROOM_JOINED").await
    }

    /// Next envelope, or an error on close or timeout
    pub async fn recv(&mut self) -> Result<Value> {
        self.recv_within(RECV_TIMEOUT).await
    }

    /// Next envelope within `wait`
    pub async fn recv_within(&mut self, wait: Duration) -> Result<Value> {
        loop {
            let frame = tokio::time::timeout(wait, self.stream.next())
                .await
                .context("Timed out waiting for a frame")?
                .context("Socket closed")??;

            match frame {
                Message::Text(text) => return Ok(serde_json::from_str(&text)?),
                Message::Close(frame) => anyhow::bail!("Socket closed by server: {:?}", frame),
                _ => continue,
            }
        }
    }

    /// Skip envelopes until one of `message_type` arrives
    pub async fn expect(&mut self, message_type: &str) -> Result<Value> {
        let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            let envelope = self
                .recv_within(remaining)
                .await
                .with_context(|| format!("Waiting for {message_type}"))?;
            if envelope["type"] == message_type {
                return Ok(envelope);
            }
        }
    }

    /// Assert that no envelope of `message_type` arrives within `wait`
    pub async fn expect_none(&mut self, message_type: &str, wait: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Ok(());
            }
            match self.recv_within(remaining).await {
                Ok(envelope) if envelope["type"] == message_type => {
                    anyhow::bail!("Unexpected {}: {}", message_type, envelope)
                }
                Ok(_) => continue,
                // Nothing further arrived in time
                Err(_) => return Ok(()),
            }
        }
    }

    /// Wait for the server's close frame and return its code
    pub async fn expect_close(&mut self, wait: Duration) -> Result<u16> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            let frame = tokio::time::timeout(remaining, self.stream.next())
                .await
                .context("Timed out waiting for close")?
                .context("Socket ended without a close frame")??;

            if let Message::Close(frame) = frame {
                let frame = frame.context("Close frame without a code")?;
                return Ok(u16::from(frame.code));
            }
        }
    }

    /// Close the socket from the client side
    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}

/// Assert response status and parse JSON body
pub async fn assert_json<T: DeserializeOwned>(response: Response, expected_status: StatusCode) -> Result<T> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!(
            "Expected status {}, got {}. Body: {}",
            expected_status,
            status,
            body
        );
    }
    Ok(response.json().await?)
}

/// Assert response status without parsing body
pub async fn assert_status(response: Response, expected_status: StatusCode) -> Result<()> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!(
            "Expected status {}, got {}. Body: {}",
            expected_status,
            status,
            body
        );
    }
    Ok(())
}

/// Redis URL for live tests, or `None` to skip them
pub fn redis_url() -> Option<String> {
    dotenvy::dotenv().ok();
    match std::env::var("REDIS_URL") {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!("Skipping test: REDIS_URL not set");
            None
        }
    }
}
