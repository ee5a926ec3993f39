/*
 * Responsibility
 * - /authors handlers
 * - ApiJson -> DTO validate() -> Library; failures surface as AppError
 */
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    api::v1::{
        dto::authors::{AuthorsResponse, CreateAuthorRequest},
        extractors::{ApiJson, request_ctx::RequestContext},
    },
    error::AppError,
    repos::snapshot::Author,
    state::AppState,
};

pub async fn list_authors(State(state): State<AppState>) -> Json<AuthorsResponse> {
    Json(AuthorsResponse {
        authors: state.library.list_authors().await,
    })
}

pub async fn get_author(
    State(state): State<AppState>,
    Path(author_id): Path<String>,
) -> Result<Json<Author>, AppError> {
    Ok(Json(state.library.get_author(&author_id).await?))
}

pub async fn create_author(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiJson(req): ApiJson<CreateAuthorRequest>,
) -> Result<(StatusCode, Json<Author>), AppError> {
    let input = req.validate()?;
    let author = state.library.create_author(input).await?;

    tracing::info!(request_id = %ctx.correlation_id, author_id = %author.id, "author created");
    Ok((StatusCode::CREATED, Json(author)))
}
