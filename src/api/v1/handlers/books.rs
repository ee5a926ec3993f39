/*
 * Responsibility
 * - /books handlers: list/search, CRUD, stats
 * - GET /books answers { books } without query params and { total, items } with any
 */
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    api::v1::{
        dto::{
            DeleteResponse,
            books::{BooksQuery, BooksResponse, CreateBookRequest, UpdateBookRequest},
        },
        extractors::{ApiJson, ApiQuery, request_ctx::RequestContext},
    },
    error::AppError,
    repos::snapshot::Book,
    services::library::BookSearch,
    services::stats::{AuthorStats, BookStats, LibraryStats},
    state::AppState,
};

pub async fn list_books(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<BooksQuery>,
) -> Response {
    if query.is_search() {
        let search = BookSearch::from(query);
        return Json(state.library.search_books(&search).await).into_response();
    }

    Json(BooksResponse {
        books: state.library.list_books().await,
    })
    .into_response()
}

pub async fn get_book(
    State(state): State<AppState>,
    Path(book_id): Path<String>,
) -> Result<Json<Book>, AppError> {
    Ok(Json(state.library.get_book(&book_id).await?))
}

pub async fn create_book(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiJson(req): ApiJson<CreateBookRequest>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let input = req.validate()?;
    let book = state.library.create_book(input).await?;

    tracing::info!(request_id = %ctx.correlation_id, book_id = %book.id, "book created");
    Ok((StatusCode::CREATED, Json(book)))
}

pub async fn update_book(
    State(state): State<AppState>,
    Path(book_id): Path<String>,
    ApiJson(req): ApiJson<UpdateBookRequest>,
) -> Result<Json<Book>, AppError> {
    let patch = req.validate()?;
    Ok(Json(state.library.update_book(&book_id, patch).await?))
}

pub async fn delete_book(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(book_id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let ok = state.library.remove_book(&book_id).await?;
    if ok {
        tracing::info!(request_id = %ctx.correlation_id, %book_id, "book deleted");
    }
    Ok(Json(DeleteResponse { ok }))
}

pub async fn library_stats(State(state): State<AppState>) -> Json<LibraryStats> {
    Json(state.library.library_stats().await)
}

pub async fn author_stats(
    State(state): State<AppState>,
    Path(author_id): Path<String>,
) -> Result<Json<AuthorStats>, AppError> {
    Ok(Json(state.library.author_stats(&author_id).await?))
}

pub async fn book_stats(
    State(state): State<AppState>,
    Path(book_id): Path<String>,
) -> Result<Json<BookStats>, AppError> {
    Ok(Json(state.library.book_stats(&book_id).await?))
}
