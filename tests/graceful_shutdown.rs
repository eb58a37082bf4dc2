//! Graceful shutdown against a live server.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{http::StatusCode, routing::get, Router};
use tokio::sync::Notify;

use movie_api::config::ServerConfig;
use movie_api::lifecycle::ShutdownError;

mod common;

/// A route that signals when it starts and then takes `duration` to answer.
fn slow_routes(duration: Duration, started: Arc<Notify>) -> Router {
    Router::new().route(
        "/slow",
        get(move || {
            let started = started.clone();
            async move {
                started.notify_one();
                tokio::time::sleep(duration).await;
                "done"
            }
        }),
    )
}

fn config(shutdown_secs: u64) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.rate_limit.enabled = false;
    config.timeouts.shutdown_secs = shutdown_secs;
    config.timeouts.request_secs = 120;
    config
}

#[tokio::test]
async fn test_in_flight_request_finishes_before_stop() {
    let started = Arc::new(Notify::new());
    let mut server = common::start_server(
        config(5),
        Some(slow_routes(Duration::from_secs(1), started.clone())),
    )
    .await;
    let addr = server.addr;

    let client = common::client();
    let url = server.url("/slow");
    let request = tokio::spawn(async move { client.get(url).send().await });

    started.notified().await;
    let shutdown_at = Instant::now();
    server.trigger_shutdown();

    let res = request.await.unwrap().expect("in-flight request should complete");
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "done");

    server.finish().await.expect("drain should succeed");
    assert!(shutdown_at.elapsed() < Duration::from_secs(5));

    // The listening socket is closed once the accept loop has returned.
    assert!(tokio::net::TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn test_drain_timeout_is_reported() {
    let started = Arc::new(Notify::new());
    let mut server = common::start_server(
        config(1),
        Some(slow_routes(Duration::from_secs(60), started.clone())),
    )
    .await;

    let client = common::client();
    let url = server.url("/slow");
    let request = tokio::spawn(async move { client.get(url).send().await });

    started.notified().await;
    server.trigger_shutdown();

    let shutdown_at = Instant::now();
    let err = server.finish().await.unwrap_err();
    assert!(shutdown_at.elapsed() >= Duration::from_millis(900));
    assert!(matches!(err, ShutdownError::DrainTimeout { in_flight: 1, .. }));

    request.abort();
}

#[tokio::test]
async fn test_idle_server_stops_immediately() {
    let server = common::start_server(config(5), None).await;
    let client = common::client();

    // Leaves an idle keep-alive connection in the client pool.
    let res = client.get(server.url("/v1/healthcheck")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let started = Instant::now();
    server.finish().await.expect("idle server should stop cleanly");
    assert!(started.elapsed() < Duration::from_secs(2));
}
