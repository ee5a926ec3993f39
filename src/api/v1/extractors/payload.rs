/*
 * Responsibility
 * - Json / Query wrappers that reject through AppError instead of axum's plain-text bodies
 * - Malformed JSON, wrong content type and bad query strings all end up in the error envelope
 */
use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts, Query, Request,
        rejection::{JsonRejection, QueryRejection},
    },
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e: QueryRejection| AppError::from(e))?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        http::{StatusCode, header},
        response::Response,
        routing::{get, post},
    };
    use serde::Deserialize;
    use serde_json::Value;
    use tower::ServiceExt;

    #[derive(Debug, Deserialize)]
    struct Payload {
        name: String,
    }

    #[derive(Debug, Deserialize)]
    struct Paging {
        limit: Option<usize>,
    }

    fn app() -> Router {
        Router::new()
            .route("/json", post(|ApiJson(p): ApiJson<Payload>| async move { p.name }))
            .route(
                "/query",
                get(|ApiQuery(p): ApiQuery<Paging>| async move { format!("{:?}", p.limit) }),
            )
    }

    async fn error_code(res: Response) -> Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        body["error"]["code"].clone()
    }

    fn json_request(body: &'static str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/json")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn accepts_valid_json() {
        let res = app().oneshot(json_request(r#"{"name":"Le Guin"}"#)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn syntax_error_is_invalid_json() {
        let res = app().oneshot(json_request("{not json")).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_code(res).await, "invalid_json");
    }

    #[tokio::test]
    async fn wrong_shape_is_validation_error() {
        let res = app().oneshot(json_request(r#"{"name":42}"#)).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_code(res).await, "validation_error");
    }

    #[tokio::test]
    async fn missing_content_type_is_rejected() {
        let req = Request::builder()
            .method("POST")
            .uri("/json")
            .body(Body::from(r#"{"name":"x"}"#))
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(error_code(res).await, "unsupported_media_type");
    }

    #[tokio::test]
    async fn bad_query_is_invalid_query() {
        let req = Request::builder().uri("/query?limit=many").body(Body::empty()).unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_code(res).await, "invalid_query");
    }
}
