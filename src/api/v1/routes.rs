/*
 * Responsibility
 * - v1 URL structure (/authors, /books, /reviews)
 * - Static segments (/books/stats/...) win over /books/{book_id} in the matcher
 */
use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::api::v1::handlers::{
    authors::{create_author, get_author, list_authors},
    books::{
        author_stats, book_stats, create_book, delete_book, get_book, library_stats, list_books,
        update_book,
    },
    reviews::{create_review, delete_review, list_book_reviews},
};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/authors", get(list_authors).post(create_author))
        .route("/authors/{author_id}", get(get_author))
        .route("/books", get(list_books).post(create_book))
        .route("/books/stats/library", get(library_stats))
        .route("/books/stats/author/{author_id}", get(author_stats))
        .route(
            "/books/{book_id}",
            get(get_book).patch(update_book).delete(delete_book),
        )
        .route("/books/{book_id}/stats", get(book_stats))
        .route("/reviews", post(create_review))
        .route("/reviews/book/{book_id}", get(list_book_reviews))
        .route("/reviews/{review_id}", delete(delete_review))
}
