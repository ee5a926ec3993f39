/*
 * Responsibility
 * - Hand the per-request correlation id (set by the request id stage) to handlers
 * - Handlers only depend on RequestContext; how it is minted stays in middleware
 */
use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
pub use crate::middleware::request_id::RequestContext;

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("request context missing")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        extract::Request,
        http::StatusCode,
        middleware,
        routing::get,
    };
    use tower::ServiceExt;

    use crate::middleware::request_id;

    async fn echo(ctx: RequestContext) -> String {
        ctx.correlation_id
    }

    #[tokio::test]
    async fn handler_sees_correlation_id() {
        let app = Router::new()
            .route("/", get(echo))
            .layer(middleware::from_fn(request_id::annotate));

        let req = Request::builder()
            .uri("/")
            .header("x-request-id", "req-7")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"req-7");
    }

    #[tokio::test]
    async fn missing_context_is_internal_error() {
        let app = Router::new().route("/", get(echo));

        let res = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
