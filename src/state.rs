/*
 * Responsibility
 * - Shared context handed to every route handler (AppState)
 * - Clone is cheap: everything inside is behind Arc
 * - Pipeline state (limiter, origin policy) is not here; it belongs to the stages
 */
use std::sync::Arc;

use crate::services::library::Library;

#[derive(Clone, Debug)]
pub struct AppState {
    pub library: Arc<Library>,
}

impl AppState {
    pub fn new(library: Arc<Library>) -> Self {
        Self { library }
    }
}
