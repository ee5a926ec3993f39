/*
 * Responsibility
 * - Catalog records as persisted (and served) in JSON, camelCase on the wire
 * - LibrarySnapshot: the whole catalog, loaded/saved as a unit
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default)]
    pub genres: Vec<String>,
    /// 1..=5
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub book_id: String,
    pub reviewer_name: String,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

// Older snapshots predate reviews, hence the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibrarySnapshot {
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub books: Vec<Book>,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_without_reviews_still_loads() {
        let raw = r#"{
            "authors": [{ "id": "a1", "name": "Ursula" }],
            "books": [{ "id": "b1", "title": "Earthsea", "authorId": "a1" }]
        }"#;

        let snapshot: LibrarySnapshot = serde_json::from_str(raw).unwrap();

        assert_eq!(snapshot.authors.len(), 1);
        assert_eq!(snapshot.books[0].author_id, "a1");
        assert!(snapshot.books[0].genres.is_empty());
        assert!(snapshot.reviews.is_empty());
    }

    #[test]
    fn optional_fields_are_omitted_on_the_wire() {
        let author = Author {
            id: "a1".into(),
            name: "Ursula".into(),
            country: None,
        };

        let value = serde_json::to_value(&author).unwrap();
        assert_eq!(value, serde_json::json!({ "id": "a1", "name": "Ursula" }));
    }
}
