pub mod authors;
pub mod books;
pub mod reviews;
pub mod validation;

use serde::{Deserialize, Deserializer, Serialize};

/// `{ "ok": bool }` for deletes; `false` when nothing matched.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub ok: bool,
}

/// Tri-state field for PATCH bodies:
/// - missing -> `None` (keep)
/// - `null` -> `Some(None)` (clear)
/// - value -> `Some(Some(v))` (set)
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
