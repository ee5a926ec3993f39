/*
 * Responsibility
 * - Catalog operations (authors, books, reviews, search, stats)
 * - Holds the in-memory snapshot; every mutation is persisted before it becomes visible
 * - Errors carry catalog meaning only; HTTP mapping lives in crate::error
 */
use std::cmp::Ordering;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{RwLock, RwLockWriteGuard};
use uuid::Uuid;

use crate::repos::error::RepoError;
use crate::repos::snapshot::{Author, Book, LibrarySnapshot, Review};
use crate::repos::store::SnapshotStore;
use crate::services::stats::{self, AuthorStats, BookStats, LibraryStats};

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("author not found")]
    AuthorNotFound,
    #[error("book not found")]
    BookNotFound,
    #[error("referenced author does not exist")]
    UnknownAuthor,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct NewAuthor {
    pub name: String,
    pub country: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub author_id: String,
    pub year: Option<i32>,
    pub genres: Vec<String>,
    pub rating: Option<f64>,
}

/// Partial update; `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author_id: Option<String>,
    pub year: Option<Option<i32>>,
    pub genres: Option<Vec<String>>,
    pub rating: Option<Option<f64>>,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub book_id: String,
    pub reviewer_name: String,
    pub rating: u8,
    pub comment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    Title,
    Year,
    Rating,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default)]
pub struct BookSearch {
    /// Case-insensitive title substring.
    pub q: Option<String>,
    /// Case-insensitive exact genre.
    pub genre: Option<String>,
    pub limit: Option<usize>,
    pub offset: usize,
    pub sort: Option<SortField>,
    pub order: SortOrder,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchPage {
    pub total: usize,
    pub items: Vec<Book>,
}

pub struct Library {
    snapshot: RwLock<LibrarySnapshot>,
    store: Arc<dyn SnapshotStore>,
}

impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("store", &self.store.backend_name())
            .finish_non_exhaustive()
    }
}

impl Library {
    pub async fn open(store: Arc<dyn SnapshotStore>) -> Self {
        let snapshot = store.load().await;
        tracing::info!(
            backend = store.backend_name(),
            authors = snapshot.authors.len(),
            books = snapshot.books.len(),
            reviews = snapshot.reviews.len(),
            "library loaded"
        );
        Self {
            snapshot: RwLock::new(snapshot),
            store,
        }
    }

    // ---- authors ----

    pub async fn list_authors(&self) -> Vec<Author> {
        self.snapshot.read().await.authors.clone()
    }

    pub async fn get_author(&self, id: &str) -> Result<Author, LibraryError> {
        self.snapshot
            .read()
            .await
            .authors
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or(LibraryError::AuthorNotFound)
    }

    pub async fn create_author(&self, input: NewAuthor) -> Result<Author, LibraryError> {
        let author = Author {
            id: new_id(),
            name: input.name,
            country: input.country,
        };

        let mut guard = self.snapshot.write().await;
        let mut next = guard.clone();
        next.authors.push(author.clone());
        self.commit(&mut guard, next).await?;
        Ok(author)
    }

    // ---- books ----

    pub async fn list_books(&self) -> Vec<Book> {
        self.snapshot.read().await.books.clone()
    }

    pub async fn get_book(&self, id: &str) -> Result<Book, LibraryError> {
        self.snapshot
            .read()
            .await
            .books
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or(LibraryError::BookNotFound)
    }

    pub async fn search_books(&self, search: &BookSearch) -> SearchPage {
        let guard = self.snapshot.read().await;
        let q = search.q.as_deref().map(str::to_lowercase);

        let mut items: Vec<Book> = guard
            .books
            .iter()
            .filter(|b| {
                q.as_deref()
                    .is_none_or(|q| b.title.to_lowercase().contains(q))
            })
            .filter(|b| {
                search
                    .genre
                    .as_deref()
                    .is_none_or(|g| b.genres.iter().any(|bg| bg.eq_ignore_ascii_case(g)))
            })
            .cloned()
            .collect();
        drop(guard);

        if let Some(field) = search.sort {
            items.sort_by(|a, b| {
                let ord = compare_books(a, b, field);
                match search.order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            });
        }

        let total = items.len();
        let items = items
            .into_iter()
            .skip(search.offset)
            .take(search.limit.unwrap_or(usize::MAX))
            .collect();

        SearchPage { total, items }
    }

    pub async fn create_book(&self, input: NewBook) -> Result<Book, LibraryError> {
        let mut guard = self.snapshot.write().await;
        if !guard.authors.iter().any(|a| a.id == input.author_id) {
            return Err(LibraryError::UnknownAuthor);
        }

        let book = Book {
            id: new_id(),
            title: input.title,
            author_id: input.author_id,
            year: input.year,
            genres: input.genres,
            rating: input.rating,
        };

        let mut next = guard.clone();
        next.books.push(book.clone());
        self.commit(&mut guard, next).await?;
        Ok(book)
    }

    pub async fn update_book(&self, id: &str, patch: BookPatch) -> Result<Book, LibraryError> {
        let mut guard = self.snapshot.write().await;
        if let Some(author_id) = &patch.author_id
            && !guard.authors.iter().any(|a| &a.id == author_id)
        {
            return Err(LibraryError::UnknownAuthor);
        }

        let mut next = guard.clone();
        let book = next
            .books
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(LibraryError::BookNotFound)?;

        if let Some(title) = patch.title {
            book.title = title;
        }
        if let Some(author_id) = patch.author_id {
            book.author_id = author_id;
        }
        if let Some(year) = patch.year {
            book.year = year;
        }
        if let Some(genres) = patch.genres {
            book.genres = genres;
        }
        if let Some(rating) = patch.rating {
            book.rating = rating;
        }
        let updated = book.clone();

        self.commit(&mut guard, next).await?;
        Ok(updated)
    }

    /// Removes the book and its reviews. `false` when nothing matched.
    pub async fn remove_book(&self, id: &str) -> Result<bool, LibraryError> {
        let mut guard = self.snapshot.write().await;
        if !guard.books.iter().any(|b| b.id == id) {
            return Ok(false);
        }

        let mut next = guard.clone();
        next.books.retain(|b| b.id != id);
        next.reviews.retain(|r| r.book_id != id);
        self.commit(&mut guard, next).await?;
        Ok(true)
    }

    // ---- reviews ----

    /// Newest first.
    pub async fn reviews_for_book(&self, book_id: &str) -> Vec<Review> {
        let mut reviews: Vec<Review> = self
            .snapshot
            .read()
            .await
            .reviews
            .iter()
            .filter(|r| r.book_id == book_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        reviews
    }

    pub async fn create_review(&self, input: NewReview) -> Result<Review, LibraryError> {
        let mut guard = self.snapshot.write().await;
        if !guard.books.iter().any(|b| b.id == input.book_id) {
            return Err(LibraryError::BookNotFound);
        }

        let review = Review {
            id: new_id(),
            book_id: input.book_id,
            reviewer_name: input.reviewer_name,
            rating: input.rating,
            comment: input.comment,
            created_at: Utc::now(),
        };

        let mut next = guard.clone();
        next.reviews.push(review.clone());
        self.commit(&mut guard, next).await?;
        Ok(review)
    }

    pub async fn delete_review(&self, id: &str) -> Result<bool, LibraryError> {
        let mut guard = self.snapshot.write().await;
        if !guard.reviews.iter().any(|r| r.id == id) {
            return Ok(false);
        }

        let mut next = guard.clone();
        next.reviews.retain(|r| r.id != id);
        self.commit(&mut guard, next).await?;
        Ok(true)
    }

    // ---- stats ----

    pub async fn library_stats(&self) -> LibraryStats {
        stats::library_stats(&*self.snapshot.read().await)
    }

    pub async fn author_stats(&self, author_id: &str) -> Result<AuthorStats, LibraryError> {
        let guard = self.snapshot.read().await;
        let author = guard
            .authors
            .iter()
            .find(|a| a.id == author_id)
            .ok_or(LibraryError::AuthorNotFound)?;
        let books: Vec<&Book> = guard
            .books
            .iter()
            .filter(|b| b.author_id == author_id)
            .collect();
        Ok(stats::author_stats(author, &books))
    }

    pub async fn book_stats(&self, book_id: &str) -> Result<BookStats, LibraryError> {
        let guard = self.snapshot.read().await;
        let book = guard
            .books
            .iter()
            .find(|b| b.id == book_id)
            .ok_or(LibraryError::BookNotFound)?;
        Ok(stats::book_stats(book, &guard.reviews))
    }

    /// Persists `next`, then publishes it. A failed save leaves the catalog untouched.
    async fn commit(
        &self,
        guard: &mut RwLockWriteGuard<'_, LibrarySnapshot>,
        next: LibrarySnapshot,
    ) -> Result<(), LibraryError> {
        self.store.save(&next).await?;
        **guard = next;
        Ok(())
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn compare_books(a: &Book, b: &Book, field: SortField) -> Ordering {
    match field {
        SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortField::Year => a.year.cmp(&b.year),
        SortField::Rating => a
            .rating
            .unwrap_or(0.0)
            .total_cmp(&b.rating.unwrap_or(0.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::store::MemorySnapshotStore;
    use async_trait::async_trait;

    async fn library() -> (Library, MemorySnapshotStore) {
        let store = MemorySnapshotStore::default();
        let library = Library::open(Arc::new(store.clone())).await;
        (library, store)
    }

    async fn seed_author(library: &Library) -> Author {
        library
            .create_author(NewAuthor {
                name: "Ursula".into(),
                country: None,
            })
            .await
            .unwrap()
    }

    fn new_book(author_id: &str, title: &str, year: Option<i32>, genres: &[&str]) -> NewBook {
        NewBook {
            title: title.into(),
            author_id: author_id.into(),
            year,
            genres: genres.iter().map(|g| g.to_string()).collect(),
            rating: None,
        }
    }

    #[tokio::test]
    async fn mutations_are_persisted() {
        let (library, store) = library().await;
        let author = seed_author(&library).await;
        library
            .create_book(new_book(&author.id, "Earthsea", None, &[]))
            .await
            .unwrap();

        let saved = store.current();
        assert_eq!(saved.authors.len(), 1);
        assert_eq!(saved.books.len(), 1);
    }

    #[tokio::test]
    async fn book_requires_existing_author() {
        let (library, _) = library().await;
        let err = library
            .create_book(new_book("missing", "Orphan", None, &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::UnknownAuthor));
    }

    #[tokio::test]
    async fn update_applies_partial_patch() {
        let (library, _) = library().await;
        let author = seed_author(&library).await;
        let book = library
            .create_book(new_book(&author.id, "Earthsea", Some(1968), &["fantasy"]))
            .await
            .unwrap();

        let updated = library
            .update_book(
                &book.id,
                BookPatch {
                    title: Some("A Wizard of Earthsea".into()),
                    year: Some(None),
                    ..BookPatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "A Wizard of Earthsea");
        assert_eq!(updated.year, None);
        assert_eq!(updated.genres, vec!["fantasy"]);

        let err = library
            .update_book("missing", BookPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::BookNotFound));
    }

    #[tokio::test]
    async fn search_filters_sorts_and_pages() {
        let (library, _) = library().await;
        let author = seed_author(&library).await;
        for (title, year, genres) in [
            ("The Dispossessed", 1974, &["sf"][..]),
            ("The Left Hand of Darkness", 1969, &["sf"][..]),
            ("Tehanu", 1990, &["fantasy"][..]),
        ] {
            library
                .create_book(new_book(&author.id, title, Some(year), genres))
                .await
                .unwrap();
        }

        let page = library
            .search_books(&BookSearch {
                genre: Some("SF".into()),
                sort: Some(SortField::Year),
                order: SortOrder::Desc,
                limit: Some(1),
                ..BookSearch::default()
            })
            .await;

        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].title, "The Dispossessed");

        let page = library
            .search_books(&BookSearch {
                q: Some("left hand".into()),
                ..BookSearch::default()
            })
            .await;
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn reviews_need_a_book_and_go_away_with_it() {
        let (library, _) = library().await;
        let author = seed_author(&library).await;
        let book = library
            .create_book(new_book(&author.id, "Earthsea", None, &[]))
            .await
            .unwrap();

        let err = library
            .create_review(NewReview {
                book_id: "missing".into(),
                reviewer_name: "Sam".into(),
                rating: 5,
                comment: "great".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::BookNotFound));

        library
            .create_review(NewReview {
                book_id: book.id.clone(),
                reviewer_name: "Sam".into(),
                rating: 4,
                comment: "great".into(),
            })
            .await
            .unwrap();
        assert_eq!(library.book_stats(&book.id).await.unwrap().average_rating, Some(4.0));

        assert!(library.remove_book(&book.id).await.unwrap());
        assert!(library.reviews_for_book(&book.id).await.is_empty());
        assert!(!library.remove_book(&book.id).await.unwrap());
    }

    struct FailingStore;

    #[async_trait]
    impl SnapshotStore for FailingStore {
        fn backend_name(&self) -> &'static str {
            "failing"
        }

        async fn load(&self) -> LibrarySnapshot {
            LibrarySnapshot::default()
        }

        async fn save(&self, _snapshot: &LibrarySnapshot) -> Result<(), RepoError> {
            Err(RepoError::Io(std::io::Error::other("disk full")))
        }
    }

    #[tokio::test]
    async fn failed_save_leaves_catalog_unchanged() {
        let library = Library::open(Arc::new(FailingStore)).await;

        let err = library
            .create_author(NewAuthor {
                name: "Ursula".into(),
                country: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, LibraryError::Repo(_)));
        assert!(library.list_authors().await.is_empty());
    }
}
