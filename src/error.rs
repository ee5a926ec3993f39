/*
 * Responsibility
 * - The single place where request failures become HTTP responses
 * - AppError::Structured: explicit status/code/message/details, passed through verbatim
 * - AppError::Internal: anything else, always 500 + "internal_error"
 * - Panic boundary response (CatchPanicLayer) using the same envelope
 */
use std::any::Any;

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::api::v1::dto::validation::ValidationErrors;
use crate::repos::error::RepoError;
use crate::services::library::LibraryError;

const FALLBACK_MESSAGE: &str = "Unexpected error";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{code}: {message}")]
    Structured {
        status: StatusCode,
        code: &'static str,
        message: String,
        details: Option<Value>,
    },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Structured error whose message defaults to the status' reason phrase.
    pub fn new(status: StatusCode, code: &'static str) -> Self {
        Self::Structured {
            status,
            code,
            message: status.canonical_reason().unwrap_or("Error").to_string(),
            details: None,
        }
    }

    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        if let Self::Structured { message, .. } = &mut self {
            *message = msg.into();
        }
        self
    }

    pub fn with_details(mut self, value: Value) -> Self {
        if let Self::Structured { details, .. } = &mut self {
            *details = Some(value);
        }
        self
    }

    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code).with_message(message)
    }

    pub fn not_found(resource: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found").with_message(format!("{resource} not found"))
    }

    pub fn too_many_requests() -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, "rate_limit_exceeded")
            .with_message("Too many requests")
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Structured { status, .. } => *status,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Structured {
                status,
                code,
                message,
                details,
            } => (
                status,
                ErrorBody {
                    message,
                    code: Some(code),
                    details,
                },
            ),
            AppError::Internal(err) => {
                tracing::error!(error = ?err, "unhandled error");
                let message = err.to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        message: if message.is_empty() {
                            FALLBACK_MESSAGE.to_string()
                        } else {
                            message
                        },
                        code: Some("internal_error"),
                        details: None,
                    },
                )
            }
        };

        (status, Json(ErrorResponse { error: body })).into_response()
    }
}

/// Converts a panic caught anywhere in the pipeline into a 500 envelope.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        FALLBACK_MESSAGE.to_string()
    };

    AppError::Internal(anyhow::anyhow!(message)).into_response()
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        AppError::Internal(e.into())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let (status, code) = match &rejection {
            // Well-formed JSON of the wrong shape (missing field, wrong type).
            JsonRejection::JsonDataError(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            JsonRejection::JsonSyntaxError(_) => (StatusCode::BAD_REQUEST, "invalid_json"),
            JsonRejection::MissingJsonContentType(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_media_type")
            }
            // Body read failures, including the request body limit.
            other if other.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large")
            }
            other => (other.status(), "invalid_body"),
        };
        AppError::new(status, code).with_message(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::bad_request("invalid_query", rejection.body_text())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::bad_request("validation_error", "Invalid request body")
            .with_details(errors.into_details())
    }
}

impl From<LibraryError> for AppError {
    fn from(e: LibraryError) -> Self {
        match e {
            LibraryError::AuthorNotFound => AppError::not_found("Author"),
            LibraryError::BookNotFound => AppError::not_found("Book"),
            LibraryError::UnknownAuthor => {
                AppError::bad_request("author_not_found", "Author not found")
            }
            LibraryError::Repo(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::json;

    async fn body_json(res: Response) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn structured_error_is_passed_through() {
        let res = AppError::new(StatusCode::NOT_FOUND, "not_found")
            .with_message("not found")
            .into_response();

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(res).await,
            json!({ "error": { "message": "not found", "code": "not_found" } })
        );
    }

    #[tokio::test]
    async fn structured_error_keeps_details() {
        let res = AppError::bad_request("validation_error", "Invalid request body")
            .with_details(json!({ "fieldErrors": { "name": ["too short"] } }))
            .into_response();

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = body_json(res).await;
        assert_eq!(body["error"]["code"], "validation_error");
        assert_eq!(body["error"]["details"]["fieldErrors"]["name"][0], "too short");
    }

    #[tokio::test]
    async fn unstructured_error_becomes_internal_error() {
        let res = AppError::from(anyhow::anyhow!("boom")).into_response();

        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(res).await,
            json!({ "error": { "message": "boom", "code": "internal_error" } })
        );
    }

    #[tokio::test]
    async fn panic_payloads_are_described() {
        let res = panic_response(Box::new("kaboom"));
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(res).await["error"]["message"], "kaboom");

        let res = panic_response(Box::new(String::from("owned")));
        assert_eq!(body_json(res).await["error"]["message"], "owned");

        let res = panic_response(Box::new(42_u8));
        let body = body_json(res).await;
        assert_eq!(body["error"]["message"], "Unexpected error");
        assert_eq!(body["error"]["code"], "internal_error");
    }

    #[test]
    fn rate_limit_rejection_shape() {
        let err = AppError::too_many_requests();
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.to_string(), "rate_limit_exceeded: Too many requests");
    }
}
