//! Prometheus metrics
//!
//! The hub and the bridge record through the `metrics` facade. Nothing is kept
//! until a recorder is installed; `run` installs the Prometheus one when the
//! exporter is enabled and serves its rendering on a separate port.

use axum::{extract::State, routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use socket_common::AppError;
use std::future::Future;
use tokio::net::TcpListener;

/// Gauge: connections held by this instance
pub const ACTIVE_CONNECTIONS: &str = "socket_active_connections";
/// Gauge: rooms with at least one local member
pub const ROOMS: &str = "socket_rooms";
/// Counter: envelopes handed to the bus
pub const PUBLISHED: &str = "socket_published_total";
/// Counter: envelopes queued on local connections by fan-out
pub const DELIVERED: &str = "socket_delivered_total";
/// Counter: connections dropped for a full outbound queue
pub const EVICTED: &str = "socket_evicted_total";
/// Counter: bus messages the hub missed by falling behind its subscription
pub const BUS_LAGGED: &str = "socket_bus_lagged_total";
/// Counter: event log records by `topic` and `outcome`
pub const BRIDGE_RECORDS: &str = "socket_bridge_records_total";

/// Install the Prometheus recorder for the whole process
pub fn install_recorder() -> Result<PrometheusHandle, AppError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(AppError::internal)?;
    describe();
    Ok(handle)
}

fn describe() {
    metrics::describe_gauge!(ACTIVE_CONNECTIONS, "Connections held by this instance");
    metrics::describe_gauge!(ROOMS, "Rooms with at least one local member");
    metrics::describe_counter!(PUBLISHED, "Envelopes published to the bus");
    metrics::describe_counter!(DELIVERED, "Envelopes queued on local connections");
    metrics::describe_counter!(EVICTED, "Slow consumers evicted");
    metrics::describe_counter!(BUS_LAGGED, "Bus messages dropped while the hub lagged");
    metrics::describe_counter!(BRIDGE_RECORDS, "Event log records processed");
}

/// Router exposing `/metrics` in the Prometheus text format
pub fn create_router(handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/metrics", get(render))
        .with_state(handle)
}

async fn render(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}

/// Serve the exporter until `shutdown` resolves
pub async fn serve<F>(
    listener: TcpListener,
    handle: PrometheusHandle,
    shutdown: F,
) -> Result<(), AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Metrics exporter listening on http://{}/metrics", addr);
    }

    axum::serve(listener, create_router(handle))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(AppError::internal)
}


#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusRecorder;

    fn recorder() -> PrometheusRecorder {
        PrometheusBuilder::new().build_recorder()
    }

    #[test]
    fn test_render_reports_recorded_values() {
        let ((), rendered) = capture::record(|| {
            metrics::gauge!(ACTIVE_CONNECTIONS).set(3.0);
            metrics::counter!(BRIDGE_RECORDS, "topic" => "contest.created", "outcome" => "skipped")
                .increment(2);
        });

        assert_eq!(capture::sample(&rendered, ACTIVE_CONNECTIONS, &[]), Some(3.0));
        assert_eq!(
            capture::sample(
                &rendered,
                BRIDGE_RECORDS,
                &[("outcome", "skipped"), ("topic", "contest.created")]
            ),
            Some(2.0)
        );
        assert_eq!(capture::sample(&rendered, BRIDGE_RECORDS, &[]), None);
    }

    #[tokio::test]
    async fn test_exporter_serves_metrics() {
        let recorder = recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || {
            metrics::counter!(PUBLISHED).increment(5);
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(serve(listener, handle, async move {
            let _ = stopped.await;
        }));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let request = format!("GET /metrics HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
        tokio::io::AsyncWriteExt::write_all(&mut stream, request.as_bytes())
            .await
            .unwrap();
        let mut response = String::new();
        tokio::io::AsyncReadExt::read_to_string(&mut stream, &mut response)
            .await
            .unwrap();

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("socket_published_total 5"));

        stop.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
