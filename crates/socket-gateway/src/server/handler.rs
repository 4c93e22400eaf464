//! WebSocket handler
//!
//! Authenticates the handshake, then runs one read pump and one write pump per
//! socket. The pumps share nothing but the connection handle: the hub feeds the
//! write pump through the outbound queue and stops it through the close signal.

use crate::connection::{Connection, Outbound};
use crate::handlers::MessageDispatcher;
use crate::hub::Hub;
use crate::protocol::CloseCode;
use crate::server::auth::{authenticate, reject, ConnectParams};
use crate::server::{GatewayState, SocketSettings};
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use socket_common::Claims;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

/// Time the write pump gets to flush a close frame after the read side ended
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// WebSocket gateway handler
///
/// The token is checked before the upgrade; a failed check never opens a socket.
pub async fn ws_handler(
    State(state): State<GatewayState>,
    Query(params): Query<ConnectParams>,
    headers: HeaderMap,
    ws: Option<WebSocketUpgrade>,
) -> Response {
    let claims = match authenticate(state.jwt(), &params, &headers) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "Handshake rejected");
            return reject(&e);
        }
    };

    let Some(ws) = ws else {
        return (StatusCode::UPGRADE_REQUIRED, "WebSocket upgrade required").into_response();
    };

    ws.on_upgrade(move |socket| handle_socket(state, socket, claims))
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(state: GatewayState, socket: WebSocket, claims: Claims) {
    let settings = state.settings();
    let hub = state.hub().clone();

    let (connection, outbound) = Connection::new(
        claims.user_id(),
        claims.username.clone(),
        settings.send_queue_capacity,
    );

    if let Err(e) = hub.register(&connection) {
        tracing::warn!(
            connection_id = %connection.id(),
            user_id = %connection.user_id(),
            error = %e,
            "Failed to register connection"
        );
        connection.close(CloseCode::UnknownError);
        refuse(socket, CloseCode::UnknownError).await;
        connection.mark_closed();
        return;
    }

    tracing::info!(
        connection_id = %connection.id(),
        user_id = %connection.user_id(),
        "WebSocket connection established"
    );

    let (sink, stream) = socket.split();

    let mut write_task = tokio::spawn(write_pump(
        sink,
        outbound,
        connection.clone(),
        settings.heartbeat_interval,
    ));
    let mut read_task = tokio::spawn(read_pump(
        stream,
        hub.clone(),
        connection.clone(),
        settings,
    ));

    // Wait for any task to complete
    tokio::select! {
        result = &mut read_task => {
            let code = result.unwrap_or(CloseCode::UnknownError);
            connection.close(code);
            if tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, &mut write_task).await.is_err() {
                write_task.abort();
            }
        }
        _ = &mut write_task => {
            read_task.abort();
        }
    }

    teardown(&hub, &connection);
}

/// Close a socket that never got pumps
async fn refuse(mut socket: WebSocket, code: CloseCode) {
    let frame = close_frame(code);
    if let Err(e) = socket.send(Message::Close(Some(frame))).await {
        tracing::debug!(error = %e, "Failed to send close frame");
    }
}

fn close_frame(code: CloseCode) -> CloseFrame<'static> {
    CloseFrame {
        code: code.as_u16(),
        reason: Cow::Borrowed(code.description()),
    }
}

/// Remove a finished connection; safe to call more than once
fn teardown(hub: &Hub, connection: &Arc<Connection>) {
    connection.close(CloseCode::Normal);
    hub.unregister(connection.id());
    connection.mark_closed();

    tracing::info!(
        connection_id = %connection.id(),
        user_id = %connection.user_id(),
        close_code = ?connection.close_code(),
        age_ms = connection.age().as_millis(),
        "WebSocket connection closed"
    );
}

/// Read frames until the peer goes away, and report why
async fn read_pump(
    mut stream: SplitStream<WebSocket>,
    hub: Arc<Hub>,
    connection: Arc<Connection>,
    settings: SocketSettings,
) -> CloseCode {
    let dead_after = settings.dead_peer_timeout();

    loop {
        let frame = match tokio::time::timeout(dead_after, stream.next()).await {
            Err(_) => {
                tracing::warn!(
                    connection_id = %connection.id(),
                    user_id = %connection.user_id(),
                    idle_ms = connection.idle_for().as_millis(),
                    "Connection timed out (no inbound traffic)"
                );
                return CloseCode::HeartbeatTimeout;
            }
            Ok(None) => return CloseCode::Normal,
            Ok(Some(Err(e))) => {
                tracing::debug!(
                    connection_id = %connection.id(),
                    error = %e,
                    "WebSocket error"
                );
                return CloseCode::UnknownError;
            }
            Ok(Some(Ok(frame))) => frame,
        };

        connection.touch();

        match frame {
            Message::Text(text) => MessageDispatcher::handle_text(&hub, &connection, &text),
            Message::Binary(data) => match std::str::from_utf8(&data) {
                Ok(text) => MessageDispatcher::handle_text(&hub, &connection, text),
                Err(_) => {
                    tracing::debug!(connection_id = %connection.id(), "Ignoring non-UTF-8 binary frame");
                }
            },
            Message::Ping(_) | Message::Pong(_) => {
                tracing::trace!(connection_id = %connection.id(), "Heartbeat frame received");
            }
            Message::Close(_) => {
                tracing::debug!(connection_id = %connection.id(), "Client closed connection");
                return CloseCode::Normal;
            }
        }
    }
}

/// Flush the outbound queue to the socket until asked to close
async fn write_pump(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: Outbound,
    connection: Arc<Connection>,
    heartbeat_interval: Duration,
) {
    loop {
        tokio::select! {
            biased;

            changed = outbound.close.changed() => {
                let code = match changed {
                    Ok(()) => *outbound.close.borrow_and_update(),
                    Err(_) => Some(CloseCode::Normal),
                };
                let Some(code) = code else { continue };

                if let Err(e) = sink.send(Message::Close(Some(close_frame(code)))).await {
                    tracing::debug!(connection_id = %connection.id(), error = %e, "Failed to send close frame");
                }
                break;
            }

            message = outbound.messages.recv() => {
                let Some(text) = message else { break };
                if let Err(e) = sink.send(Message::Text(text.to_string())).await {
                    tracing::debug!(
                        connection_id = %connection.id(),
                        error = %e,
                        "Failed to send message to WebSocket"
                    );
                    connection.close(CloseCode::UnknownError);
                    break;
                }
            }

            () = tokio::time::sleep(heartbeat_interval) => {
                if sink.send(Message::Ping(Vec::new())).await.is_err() {
                    connection.close(CloseCode::UnknownError);
                    break;
                }
                tracing::trace!(connection_id = %connection.id(), "Heartbeat ping sent");
            }
        }
    }

    let _ = sink.close().await;
}
