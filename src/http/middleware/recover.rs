//! Panic containment.
//!
//! A panic inside a handler becomes a generic 500 instead of tearing down
//! the connection task. The response asks the client to close the
//! connection, since whatever state the handler left behind is suspect.

use std::any::Any;

use axum::{
    http::{header, HeaderValue},
    response::Response,
};

use crate::http::response;
use crate::observability::metrics;

/// Response factory for `tower_http::catch_panic::CatchPanicLayer::custom`.
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else {
        "non-string panic payload"
    };

    tracing::error!(panic = %detail, "Request handler panicked");
    metrics::record_panic();

    let mut response = response::server_error();
    response
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("close"));
    response
}
