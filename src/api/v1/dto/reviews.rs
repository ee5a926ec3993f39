/*
 * Responsibility
 * - Reviews request DTO + validate()
 */
use serde::{Deserialize, Serialize};

use crate::api::v1::dto::validation::ValidationErrors;
use crate::repos::snapshot::Review;
use crate::services::library::NewReview;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub book_id: String,
    pub reviewer_name: String,
    pub rating: i64,
    pub comment: String,
}

impl CreateReviewRequest {
    pub fn validate(self) -> Result<NewReview, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check_len("bookId", &self.book_id, 1, None);
        errors.check_len("reviewerName", &self.reviewer_name, 2, Some(100));
        errors.check_len("comment", &self.comment, 1, Some(1000));
        let rating = u8::try_from(self.rating).ok().filter(|r| (1..=5).contains(r));
        if rating.is_none() {
            errors.add("rating", "must be an integer between 1 and 5");
        }
        errors.into_result()?;

        Ok(NewReview {
            book_id: self.book_id,
            reviewer_name: self.reviewer_name,
            rating: rating.unwrap_or_default(),
            comment: self.comment,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ReviewsResponse {
    pub reviews: Vec<Review>,
}
