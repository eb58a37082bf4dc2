//! Built-in route handlers.

use axum::{
    extract::State,
    http::Method,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::http::response;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone)]
pub struct HandlerState {
    pub env: String,
}

#[derive(Debug, Serialize)]
struct SystemInfo<'a> {
    environment: &'a str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct Health<'a> {
    status: &'static str,
    system_info: SystemInfo<'a>,
}

/// `GET /v1/healthcheck`
async fn healthcheck(State(state): State<HandlerState>) -> Response {
    Json(Health {
        status: "available",
        system_info: SystemInfo {
            environment: &state.env,
            version: VERSION,
        },
    })
    .into_response()
}

async fn method_not_allowed(method: Method) -> Response {
    response::method_not_allowed(&method)
}

async fn not_found() -> Response {
    response::not_found()
}

/// The routes served when no caller-supplied router is given.
pub fn routes(env: impl Into<String>) -> Router {
    let state = HandlerState { env: env.into() };
    Router::new()
        .route("/v1/healthcheck", get(healthcheck))
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(not_found)
        .with_state(state)
}
