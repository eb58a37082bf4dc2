//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Wrap the route handlers in the middleware stack
//!   (request ID, tracing, metrics, panic containment, admission, timeout)
//! - Run the accept loop until the drain signal fires
//! - Serve each connection on its own task, HTTP/1.1 and HTTP/2
//! - On drain, let each connection finish its in-flight request and close
//! - Run the idle-client eviction sweeper alongside the accept loop

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::Request,
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use hyper::body::Incoming;
use hyper_util::{
    rt::{TokioExecutor, TokioIo, TokioTimer},
    server::conn::auto,
};
use tokio::net::TcpStream;
use tower::ServiceExt;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::http::handlers;
use crate::http::middleware::{admission_middleware, handle_panic, request_metrics, AdmissionState};
use crate::http::request::{request_id, UuidRequestId};
use crate::lifecycle::DrainSignal;
use crate::net::{ConnectionGuard, ConnectionPermit, ConnectionTracker, Listener, ListenerError};
use crate::security::{ClientTable, EvictionSweeper};

/// Pause after a failed accept (e.g. out of file descriptors) before retrying.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(50);

/// HTTP server for the movie API.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
    clients: Arc<ClientTable>,
}

impl HttpServer {
    /// Create a server for the built-in routes.
    pub fn new(config: ServerConfig) -> Self {
        let routes = handlers::routes(config.env.clone());
        Self::with_routes(config, routes)
    }

    /// Create a server that admits requests into `routes`.
    pub fn with_routes(config: ServerConfig, routes: Router) -> Self {
        let limits = &config.rate_limit;
        let clients = Arc::new(ClientTable::new(limits.requests_per_second, limits.burst));
        let admission = AdmissionState::new(limits, clients.clone());

        let router = Self::build_router(&config, routes, admission);
        Self {
            router,
            config,
            clients,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, routes: Router, admission: AdmissionState) -> Router {
        routes
            .layer(TimeoutLayer::new(config.timeouts.request()))
            .layer(from_fn_with_state(admission, admission_middleware))
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(from_fn(request_metrics))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id(request),
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// The rate-limit table shared by the admission gate and the sweeper.
    pub fn clients(&self) -> Arc<ClientTable> {
        self.clients.clone()
    }

    /// Accept connections until `drain` fires, then close the listening socket and return.
    ///
    /// Connections already accepted keep running on their own tasks; each
    /// holds a guard from `connections` until it closes.
    pub async fn run(
        self,
        listener: Listener,
        drain: DrainSignal,
        connections: ConnectionTracker,
    ) -> Result<(), ListenerError> {
        let addr = listener.local_addr().map_err(ListenerError::Bind)?;
        tracing::info!(
            address = %addr,
            env = %self.config.env,
            rate_limit_enabled = self.config.rate_limit.enabled,
            "Starting server"
        );

        if self.config.rate_limit.enabled {
            let sweeper = EvictionSweeper::new(
                self.clients.clone(),
                self.config.rate_limit.sweep_interval(),
                self.config.rate_limit.idle_eviction(),
            );
            tokio::spawn(sweeper.run(drain.clone()));
        }

        let mut stop = drain.clone();
        loop {
            tokio::select! {
                biased;

                _ = stop.wait() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer, permit)) => {
                        self.spawn_connection(stream, peer, permit, connections.track(), drain.clone());
                    }
                    Err(ListenerError::Accept(e)) => {
                        tracing::warn!(error = %e, "Accept failed");
                        tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                    }
                    Err(e) => return Err(e),
                },
            }
        }

        drop(listener);
        tracing::info!(
            address = %addr,
            open_connections = connections.active_count(),
            "Stopped accepting connections"
        );
        Ok(())
    }

    fn spawn_connection(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        permit: ConnectionPermit,
        guard: ConnectionGuard,
        mut drain: DrainSignal,
    ) {
        let router = self.router.clone();
        let read_header_timeout = self.config.timeouts.read_header();

        tokio::spawn(async move {
            let _permit = permit;
            let connection_id = guard.id();

            let service = hyper::service::service_fn(move |mut request: Request<Incoming>| {
                request.extensions_mut().insert(ConnectInfo(peer));
                router.clone().oneshot(request)
            });

            let mut builder = auto::Builder::new(TokioExecutor::new());
            builder
                .http1()
                .timer(TokioTimer::new())
                .header_read_timeout(read_header_timeout);

            let conn = builder.serve_connection_with_upgrades(TokioIo::new(stream), service);
            tokio::pin!(conn);

            let result = tokio::select! {
                result = conn.as_mut() => result,
                _ = drain.wait() => {
                    tracing::debug!(connection_id = %connection_id, "Draining connection");
                    conn.as_mut().graceful_shutdown();
                    conn.await
                }
            };

            if let Err(e) = result {
                tracing::debug!(
                    connection_id = %connection_id,
                    peer_addr = %peer,
                    error = %e,
                    "Connection ended with error"
                );
            }
            drop(guard);
        });
    }
}
