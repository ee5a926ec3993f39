//! Correlation id per request (`x-request-id`).
//!
//! - A non-empty incoming `x-request-id` is reused verbatim (client-side tracing across retries).
//! - Otherwise a fresh UUID v4 is generated.
//! - The id is stored as [`RequestContext`] in request extensions and echoed on the response.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Per-request context, alive for the duration of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub correlation_id: String,
}

pub async fn annotate(mut req: Request, next: Next) -> Response {
    let correlation_id = req
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    req.extensions_mut().insert(RequestContext {
        correlation_id: correlation_id.clone(),
    });

    let mut res = next.run(req).await;

    // Incoming ids were valid header values already; generated ones are ASCII.
    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    res
}
