//! Aggregations over the catalog.
use std::collections::HashMap;

use serde::Serialize;

use crate::repos::snapshot::{Author, Book, LibrarySnapshot, Review};

const TOP_AUTHORS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorStats {
    pub author: Author,
    pub books_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookStats {
    pub book: Book,
    pub review_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub authors: usize,
    pub books: usize,
    pub reviews: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenreCount {
    pub genre: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryStats {
    pub totals: Totals,
    pub top_authors: Vec<AuthorStats>,
    pub genres: Vec<GenreCount>,
}

/// Mean rounded to two decimals; `None` for an empty input.
pub fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    Some((mean * 100.0).round() / 100.0)
}

pub fn author_stats(author: &Author, books: &[&Book]) -> AuthorStats {
    // Unrated books do not drag the average down.
    let ratings: Vec<f64> = books
        .iter()
        .filter_map(|b| b.rating)
        .filter(|r| *r > 0.0)
        .collect();

    let mut genres: Vec<String> = books.iter().flat_map(|b| b.genres.iter().cloned()).collect();
    genres.sort();
    genres.dedup();

    AuthorStats {
        author: author.clone(),
        books_count: books.len(),
        average_rating: average(&ratings),
        genres,
    }
}

pub fn book_stats(book: &Book, reviews: &[Review]) -> BookStats {
    let ratings: Vec<f64> = reviews
        .iter()
        .filter(|r| r.book_id == book.id)
        .map(|r| f64::from(r.rating))
        .collect();

    BookStats {
        book: book.clone(),
        review_count: ratings.len(),
        average_rating: average(&ratings),
    }
}

pub fn library_stats(snapshot: &LibrarySnapshot) -> LibraryStats {
    let mut by_author: HashMap<&str, Vec<&Book>> = HashMap::new();
    for book in &snapshot.books {
        by_author.entry(book.author_id.as_str()).or_default().push(book);
    }

    let mut per_author: Vec<AuthorStats> = snapshot
        .authors
        .iter()
        .map(|a| {
            let books = by_author.get(a.id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
            author_stats(a, books)
        })
        .collect();
    // Stable: ties keep catalog order.
    per_author.sort_by(|a, b| {
        b.average_rating
            .unwrap_or(0.0)
            .total_cmp(&a.average_rating.unwrap_or(0.0))
    });
    per_author.truncate(TOP_AUTHORS);

    // First-seen order breaks count ties.
    let mut genres: Vec<GenreCount> = Vec::new();
    for genre in snapshot.books.iter().flat_map(|b| b.genres.iter()) {
        match genres.iter_mut().find(|g| &g.genre == genre) {
            Some(g) => g.count += 1,
            None => genres.push(GenreCount {
                genre: genre.clone(),
                count: 1,
            }),
        }
    }
    genres.sort_by(|a, b| b.count.cmp(&a.count));

    LibraryStats {
        totals: Totals {
            authors: snapshot.authors.len(),
            books: snapshot.books.len(),
            reviews: snapshot.reviews.len(),
        },
        top_authors: per_author,
        genres,
    }
}
