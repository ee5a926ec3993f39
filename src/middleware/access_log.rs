//! One structured line per completed request (TraceLayer with our own span/response hooks).
//!
//! The span carries `method`, `path` and `request_id`; the completion event adds `status`
//! and `duration_ms`. Purely observational: nothing here touches the response.
//!
//! `duration_ms` is measured up to the response head (status and headers produced).
//! Every handler here returns a fully buffered JSON body, so body streaming adds
//! nothing meaningful; a streaming route would need an `on_eos` hook as well.

use std::time::Duration;

use axum::http::{Request, Response};
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultOnRequest, MakeSpan, OnResponse, TraceLayer};
use tracing::Span;

use super::request_id::RequestContext;

pub type AccessLogLayer =
    TraceLayer<SharedClassifier<ServerErrorsAsFailures>, AccessSpan, DefaultOnRequest, AccessLine>;

pub fn layer() -> AccessLogLayer {
    TraceLayer::new_for_http()
        .make_span_with(AccessSpan)
        .on_response(AccessLine)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AccessSpan;

impl<B> MakeSpan<B> for AccessSpan {
    fn make_span(&mut self, req: &Request<B>) -> Span {
        // Runs inside the request id stage, so the context is normally present.
        let request_id = req
            .extensions()
            .get::<RequestContext>()
            .map(|ctx| ctx.correlation_id.as_str())
            .unwrap_or("-");

        tracing::info_span!(
            "request",
            method = %req.method(),
            path = %req.uri().path(),
            request_id = %request_id,
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AccessLine;

impl<B> OnResponse<B> for AccessLine {
    fn on_response(self, res: &Response<B>, latency: Duration, _span: &Span) {
        tracing::info!(
            status = res.status().as_u16(),
            duration_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
            "request completed"
        );
    }
}
