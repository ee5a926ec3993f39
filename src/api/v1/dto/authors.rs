/*
 * Responsibility
 * - Authors request DTO + validate()
 * - Responses are the stored Author record itself
 */
use serde::{Deserialize, Serialize};

use crate::api::v1::dto::validation::ValidationErrors;
use crate::repos::snapshot::Author;
use crate::services::library::NewAuthor;

#[derive(Debug, Deserialize)]
pub struct CreateAuthorRequest {
    pub name: String,
    pub country: Option<String>,
}

impl CreateAuthorRequest {
    pub fn validate(self) -> Result<NewAuthor, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check_len("name", &self.name, 2, None);
        errors.into_result()?;

        Ok(NewAuthor {
            name: self.name,
            country: self.country,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct AuthorsResponse {
    pub authors: Vec<Author>,
}
