//! Admission gate: per-client rate limiting in front of every route.
//!
//! The client is identified by the peer IP of the connection (port
//! stripped). A request without a peer address is a server fault and
//! gets a 500, never a 429.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::config::RateLimitConfig;
use crate::http::request::request_id;
use crate::http::response;
use crate::observability::metrics;
use crate::security::rate_limit::ClientTable;

#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error("request has no peer address to identify the client")]
    MissingPeerAddress,
}

/// State shared by every invocation of the gate.
#[derive(Debug, Clone)]
pub struct AdmissionState {
    enabled: bool,
    clients: Arc<ClientTable>,
}

impl AdmissionState {
    pub fn new(config: &RateLimitConfig, clients: Arc<ClientTable>) -> Self {
        Self {
            enabled: config.enabled,
            clients,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        let clients = Arc::new(ClientTable::new(config.requests_per_second, config.burst));
        Self::new(config, clients)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn clients(&self) -> &Arc<ClientTable> {
        &self.clients
    }
}

/// The client IP this request is accounted against.
pub fn client_identity<B>(request: &Request<B>) -> Result<IpAddr, AdmissionError> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_canonical())
        .ok_or(AdmissionError::MissingPeerAddress)
}

/// Middleware function for per-client rate limiting.
pub async fn admission_middleware(
    State(state): State<AdmissionState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.enabled {
        return next.run(request).await;
    }

    let client = match client_identity(&request) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(
                error = %e,
                request_id = %request_id(&request),
                method = %request.method(),
                uri = %request.uri(),
                "Cannot identify client"
            );
            return response::server_error();
        }
    };

    if state.clients.check(client) {
        next.run(request).await
    } else {
        tracing::warn!(
            client = %client,
            request_id = %request_id(&request),
            "Rate limit exceeded"
        );
        metrics::record_rate_limited();
        response::rate_limit_exceeded()
    }
}
