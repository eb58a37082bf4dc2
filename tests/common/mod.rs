//! Shared utilities for integration tests.

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use movie_api::config::ServerConfig;
use movie_api::lifecycle::{ShutdownCoordinator, ShutdownError, ShutdownHandle, ShutdownSignal};
use movie_api::net::{Listener, ListenerError};
use movie_api::HttpServer;

/// A server running on an ephemeral port, shut down by a test-controlled trigger
/// instead of an OS signal.
pub struct TestServer {
    pub addr: SocketAddr,
    trigger: Option<oneshot::Sender<()>>,
    shutdown: ShutdownHandle,
    server: JoinHandle<Result<(), ListenerError>>,
}

/// Start a server with `routes` as the downstream handler, or the built-in routes.
pub async fn start_server(config: ServerConfig, routes: Option<Router>) -> TestServer {
    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = tcp.local_addr().unwrap();
    let listener = Listener::from_tcp(tcp, config.listener.max_connections);

    let coordinator = ShutdownCoordinator::new(config.timeouts.shutdown());
    let drain = coordinator.drain_signal();
    let connections = coordinator.connections();

    let (trigger, triggered) = oneshot::channel::<()>();
    let shutdown = coordinator.spawn(async move {
        let _ = triggered.await;
        Ok::<_, std::io::Error>(ShutdownSignal::Terminate)
    });

    let server = match routes {
        Some(routes) => HttpServer::with_routes(config, routes),
        None => HttpServer::new(config),
    };
    let server = tokio::spawn(server.run(listener, drain, connections));

    TestServer {
        addr,
        trigger: Some(trigger),
        shutdown,
        server,
    }
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Simulate SIGTERM.
    pub fn trigger_shutdown(&mut self) {
        if let Some(trigger) = self.trigger.take() {
            let _ = trigger.send(());
        }
    }

    /// Trigger shutdown if not yet done, wait for the accept loop to end,
    /// then collect the coordinator's outcome.
    pub async fn finish(mut self) -> Result<(), ShutdownError> {
        self.trigger_shutdown();
        self.server
            .await
            .expect("server task panicked")
            .expect("accept loop failed");
        self.shutdown.outcome().await
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
