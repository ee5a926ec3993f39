//! Fixed-order request pipeline.
//!
//! Every request passes through these stages, outermost first:
//!
//! 1. **Error translation** - panic boundary; any panic below becomes a 500 envelope
//! 2. **Request id** - reuse or mint `x-request-id`, attach [`RequestContext`]
//! 3. **CORS** - grant headers per origin policy, answer preflight with 204
//! 4. **Rate limit** - fixed-window admission, quota headers, 429 on exhaustion
//! 5. **Access log** - one line per completed request
//! 6. **Body limit** - cap request bodies before any handler buffers them
//!
//! Structured failures raised by handlers are rendered by [`AppError`]'s `IntoResponse`
//! at the point they are returned, so every stage above sees a finished response.
//! The pipeline wraps the whole router (not `Router::layer`), so stages also run for
//! unmatched paths and preflight never reaches routing.
//!
//! [`RequestContext`]: super::request_id::RequestContext
//! [`AppError`]: crate::error::AppError

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Router,
    extract::Request,
    middleware,
    response::{IntoResponse, Response},
};
use tower::{ServiceBuilder, util::BoxCloneSyncService};
use tower_http::{catch_panic::CatchPanicLayer, limit::RequestBodyLimitLayer};

use super::{access_log, cors, cors::OriginPolicy, rate_limit, rate_limit::RateLimiter, request_id};
use crate::error;

/// JSON bodies above this size are refused before reaching a handler.
pub const BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// The assembled pipeline, ready to be served.
pub type PipelineService = BoxCloneSyncService<Request, Response, Infallible>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ErrorTranslation,
    RequestId,
    Cors,
    RateLimit,
    AccessLog,
    BodyLimit,
}

impl Stage {
    /// Outermost first.
    pub const ORDER: [Stage; 6] = [
        Stage::ErrorTranslation,
        Stage::RequestId,
        Stage::Cors,
        Stage::RateLimit,
        Stage::AccessLog,
        Stage::BodyLimit,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::ErrorTranslation => "error_translation",
            Stage::RequestId => "request_id",
            Stage::Cors => "cors",
            Stage::RateLimit => "rate_limit",
            Stage::AccessLog => "access_log",
            Stage::BodyLimit => "body_limit",
        }
    }
}

#[derive(Debug)]
pub struct Pipeline {
    origin_policy: Arc<OriginPolicy>,
    limiter: RateLimiter,
}

impl Pipeline {
    pub fn new(origin_policy: OriginPolicy, limiter: RateLimiter) -> Self {
        Self {
            origin_policy: Arc::new(origin_policy),
            limiter,
        }
    }

    /// Wraps the route layer in every stage of [`Stage::ORDER`]. Called once at startup.
    pub fn wrap(self, routes: Router) -> PipelineService {
        tracing::info!(
            stages = ?Stage::ORDER.map(Stage::name),
            origin_policy = ?self.origin_policy,
            max_requests = self.limiter.config().max_requests,
            window = ?self.limiter.config().window,
            "request pipeline assembled"
        );

        let stages = ServiceBuilder::new()
            // CatchPanic boxes the body; bring it back to axum's Response for serving.
            .map_response(IntoResponse::into_response)
            .layer(CatchPanicLayer::custom(error::panic_response))
            .layer(middleware::from_fn(request_id::annotate))
            .layer(middleware::from_fn_with_state(
                self.origin_policy,
                cors::evaluate,
            ))
            .layer(middleware::from_fn_with_state(
                self.limiter,
                rate_limit::enforce,
            ))
            .layer(access_log::layer())
            .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES));

        BoxCloneSyncService::new(stages.service(routes))
    }
}
