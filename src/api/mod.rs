/*
 * Responsibility
 * - The route layer: /health + /api/v1, and the 404 envelope for everything else
 * - Knows nothing about the pipeline; app.rs wraps this Router in it
 */
pub mod v1;

use std::sync::Arc;

use axum::{Router, routing::get};

use crate::error::AppError;
use crate::services::library::Library;
use crate::state::AppState;

pub fn router(library: Arc<Library>) -> Router {
    let state = AppState::new(library);

    Router::new()
        .route("/health", get(v1::handlers::health::health))
        .nest("/api/v1", v1::routes())
        .fallback(unmatched)
        .with_state(state)
}

async fn unmatched() -> AppError {
    AppError::not_found("Route")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        extract::Request,
        http::{Method, StatusCode, header},
        response::Response,
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::middleware::request_id;
    use crate::repos::snapshot::LibrarySnapshot;
    use crate::repos::store::MemorySnapshotStore;

    async fn app() -> Router {
        let store = Arc::new(MemorySnapshotStore::new(LibrarySnapshot::default()));
        router(Arc::new(Library::open(store).await))
            .layer(axum::middleware::from_fn(request_id::annotate))
    }

    fn get_req(uri: &str) -> Request {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_req(method: Method, uri: &str, body: Value) -> Request {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(res: Response) -> Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn send(app: &Router, req: Request) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        (status, body_json(res).await)
    }

    #[tokio::test]
    async fn health_reports_service() {
        let app = app().await;
        let (status, body) = send(&app, get_req("/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true, "service": "library-api" }));
    }

    #[tokio::test]
    async fn unknown_route_is_not_found_envelope() {
        let app = app().await;
        let (status, body) = send(&app, get_req("/api/v1/nothing")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn catalog_flow() {
        let app = app().await;

        let (status, author) = send(
            &app,
            json_req(Method::POST, "/api/v1/authors", json!({ "name": "Ursula K. Le Guin" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let author_id = author["id"].as_str().unwrap().to_owned();

        let (status, book) = send(
            &app,
            json_req(
                Method::POST,
                "/api/v1/books",
                json!({
                    "title": "The Dispossessed",
                    "authorId": author_id,
                    "year": 1974,
                    "genres": ["SF"],
                    "rating": 5
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let book_id = book["id"].as_str().unwrap().to_owned();

        let (status, review) = send(
            &app,
            json_req(
                Method::POST,
                "/api/v1/reviews",
                json!({ "bookId": book_id, "reviewerName": "Sam", "rating": 4, "comment": "Great" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(review["bookId"], book_id.as_str());

        let (_, stats) = send(&app, get_req(&format!("/api/v1/books/{book_id}/stats"))).await;
        assert_eq!(stats["reviewCount"], 1);
        assert_eq!(stats["averageRating"], 4.0);

        let (_, page) = send(&app, get_req("/api/v1/books?q=dispo")).await;
        assert_eq!(page["total"], 1);

        let (_, listed) = send(&app, get_req("/api/v1/books")).await;
        assert_eq!(listed["books"].as_array().unwrap().len(), 1);

        let (_, library) = send(&app, get_req("/api/v1/books/stats/library")).await;
        assert_eq!(library["totals"], json!({ "authors": 1, "books": 1, "reviews": 1 }));

        let (status, deleted) = send(
            &app,
            Request::builder()
                .method(Method::DELETE)
                .uri(format!("/api/v1/books/{book_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted, json!({ "ok": true }));

        let (_, reviews) = send(&app, get_req(&format!("/api/v1/reviews/book/{book_id}"))).await;
        assert_eq!(reviews, json!({ "reviews": [] }));
    }

    #[tokio::test]
    async fn invalid_body_carries_field_details() {
        let app = app().await;
        let (status, body) = send(
            &app,
            json_req(Method::POST, "/api/v1/authors", json!({ "name": "X" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "validation_error");
        assert!(body["error"]["details"]["fieldErrors"]["name"].is_array());
    }

    #[tokio::test]
    async fn book_for_unknown_author_is_rejected() {
        let app = app().await;
        let (status, body) = send(
            &app,
            json_req(Method::POST, "/api/v1/books", json!({ "title": "Orphan", "authorId": "nope" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "author_not_found");
    }

    #[tokio::test]
    async fn review_for_unknown_book_is_not_found() {
        let app = app().await;
        let (status, body) = send(
            &app,
            json_req(
                Method::POST,
                "/api/v1/reviews",
                json!({ "bookId": "missing", "reviewerName": "Sam", "rating": 3, "comment": "?" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "not_found");
    }
}
