//! JSON API handlers for the books module.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use bookhub_authz::Identity;
use bookhub_http::error::AppError;

use super::BooksState;
use crate::modules::books::models::{
    Book, BookDetail, BookFilterQuery, BookSummary, CreateBook, NewBook,
};
use crate::modules::reviews::models::ReviewProjection;

/// GET /api/books?genre=&year=&rating=
pub async fn list_books(
    State(state): State<BooksState>,
    Query(query): Query<BookFilterQuery>,
) -> Result<Json<Vec<BookSummary>>, AppError> {
    let filter = query.parse()?;
    let books = state.books.get_filtered(&filter).await?;

    Ok(Json(books.into_iter().map(BookSummary::from).collect()))
}

/// GET /api/books/{id}
pub async fn get_book(
    State(state): State<BooksState>,
    Path(id): Path<i64>,
) -> Result<Json<BookDetail>, AppError> {
    let book = state
        .books
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Book not found."))?;

    Ok(Json(BookDetail::from(book)))
}

/// POST /api/books
pub async fn create_book(
    State(state): State<BooksState>,
    identity: Identity,
    Json(dto): Json<CreateBook>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let errors = dto.validate();
    if !errors.is_empty() {
        return Err(AppError::validation(errors, "Validation failed"));
    }

    if state
        .books
        .title_author_exists(&dto.title, &dto.author)
        .await?
    {
        return Err(AppError::conflict(
            vec![],
            "A book with the same title and author already exists.",
        ));
    }

    let book = state
        .books
        .add(NewBook {
            title: dto.title,
            author: dto.author,
            published_year: dto.published_year.expect("validated above"),
            genre: dto.genre,
            user_id: identity.0,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(book)))
}

/// GET /api/books/{id}/reviews
pub async fn book_reviews(
    State(state): State<BooksState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ReviewProjection>>, AppError> {
    let book = state
        .books
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Book not found."))?;

    Ok(Json(
        book.reviews
            .into_iter()
            .map(ReviewProjection::from)
            .collect(),
    ))
}

/// Module health probe.
pub async fn health_check() -> &'static str {
    "books module is healthy"
}
