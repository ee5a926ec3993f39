/*
 * Responsibility
 * - /reviews handlers
 * - Unknown book on create -> 404 not_found (via LibraryError::BookNotFound)
 */
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    api::v1::{
        dto::{
            DeleteResponse,
            reviews::{CreateReviewRequest, ReviewsResponse},
        },
        extractors::{ApiJson, request_ctx::RequestContext},
    },
    error::AppError,
    repos::snapshot::Review,
    state::AppState,
};

pub async fn list_book_reviews(
    State(state): State<AppState>,
    Path(book_id): Path<String>,
) -> Json<ReviewsResponse> {
    Json(ReviewsResponse {
        reviews: state.library.reviews_for_book(&book_id).await,
    })
}

pub async fn create_review(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiJson(req): ApiJson<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>), AppError> {
    let input = req.validate()?;
    let review = state.library.create_review(input).await?;

    tracing::info!(
        request_id = %ctx.correlation_id,
        review_id = %review.id,
        book_id = %review.book_id,
        "review created"
    );
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn delete_review(
    State(state): State<AppState>,
    Path(review_id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let ok = state.library.delete_review(&review_id).await?;
    Ok(Json(DeleteResponse { ok }))
}
