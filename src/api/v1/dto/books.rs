/*
 * Responsibility
 * - Books request/query DTOs + validate()
 * - year: 0..=current year, rating: 1..=5, genres default to []
 */
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::api::v1::dto::nullable;
use crate::api::v1::dto::validation::ValidationErrors;
use crate::repos::snapshot::Book;
use crate::services::library::{BookPatch, BookSearch, NewBook, SortField, SortOrder};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookRequest {
    pub title: String,
    pub author_id: String,
    pub year: Option<i32>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub rating: Option<f64>,
}

impl CreateBookRequest {
    pub fn validate(self) -> Result<NewBook, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check_len("title", &self.title, 1, None);
        errors.check_len("authorId", &self.author_id, 1, None);
        if let Some(year) = self.year {
            check_year(&mut errors, year);
        }
        if let Some(rating) = self.rating {
            check_rating(&mut errors, rating);
        }
        errors.into_result()?;

        Ok(NewBook {
            title: self.title,
            author_id: self.author_id,
            year: self.year,
            genres: self.genres,
            rating: self.rating,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookRequest {
    pub title: Option<String>,
    pub author_id: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub year: Option<Option<i32>>,
    pub genres: Option<Vec<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub rating: Option<Option<f64>>,
}

impl UpdateBookRequest {
    pub fn validate(self) -> Result<BookPatch, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(title) = &self.title {
            errors.check_len("title", title, 1, None);
        }
        if let Some(author_id) = &self.author_id {
            errors.check_len("authorId", author_id, 1, None);
        }
        if let Some(Some(year)) = self.year {
            check_year(&mut errors, year);
        }
        if let Some(Some(rating)) = self.rating {
            check_rating(&mut errors, rating);
        }
        errors.into_result()?;

        Ok(BookPatch {
            title: self.title,
            author_id: self.author_id,
            year: self.year,
            genres: self.genres,
            rating: self.rating,
        })
    }
}

/// `GET /books` query. Any present field switches the response to `{ total, items }`.
#[derive(Debug, Default, Deserialize)]
pub struct BooksQuery {
    pub q: Option<String>,
    pub genre: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub sort: Option<SortField>,
    pub order: Option<SortOrder>,
}

impl BooksQuery {
    pub fn is_search(&self) -> bool {
        self.q.is_some()
            || self.genre.is_some()
            || self.limit.is_some()
            || self.offset.is_some()
            || self.sort.is_some()
            || self.order.is_some()
    }
}

impl From<BooksQuery> for BookSearch {
    fn from(q: BooksQuery) -> Self {
        BookSearch {
            q: q.q.filter(|s| !s.is_empty()),
            genre: q.genre.filter(|s| !s.is_empty()),
            limit: q.limit,
            offset: q.offset.unwrap_or(0),
            sort: q.sort,
            order: q.order.unwrap_or_default(),
        }
    }
}

fn check_year(errors: &mut ValidationErrors, year: i32) {
    let current = Utc::now().year();
    if !(0..=current).contains(&year) {
        errors.add("year", format!("must be between 0 and {current}"));
    }
}

fn check_rating(errors: &mut ValidationErrors, rating: f64) {
    if !(1.0..=5.0).contains(&rating) {
        errors.add("rating", "must be between 1 and 5");
    }
}

#[derive(Debug, Serialize)]
pub struct BooksResponse {
    pub books: Vec<Book>,
}
