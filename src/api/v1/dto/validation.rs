//! Field-level validation failures, rendered as `details.fieldErrors`.
use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Value, json};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<&'static str, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&[String]> {
        self.fields.get(name).map(Vec::as_slice)
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    pub fn into_details(self) -> Value {
        json!({ "fieldErrors": self.fields })
    }

    /// `min..=max` in characters; `None` bound means unbounded.
    pub fn check_len(&mut self, field: &'static str, value: &str, min: usize, max: Option<usize>) {
        let len = value.chars().count();
        if len < min {
            self.add(field, format!("must contain at least {min} character(s)"));
        }
        if let Some(max) = max
            && len > max
        {
            self.add(field, format!("must contain at most {max} character(s)"));
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.fields.keys().copied().collect();
        write!(f, "invalid fields: {}", names.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}
