pub mod api;
pub mod web;

use std::sync::Arc;

use super::repository::BookRepository;

/// Shared state for the books routers.
#[derive(Clone)]
pub struct BooksState {
    pub books: Arc<dyn BookRepository>,
}
