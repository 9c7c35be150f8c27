pub mod api;
pub mod web;

use std::sync::Arc;

use crate::modules::books::repository::BookRepository;

use super::repository::ReviewRepository;

/// Shared state for the reviews routers. The book repository rides
/// along for parent lookups on the create and listing paths.
#[derive(Clone)]
pub struct ReviewsState {
    pub reviews: Arc<dyn ReviewRepository>,
    pub books: Arc<dyn BookRepository>,
}
