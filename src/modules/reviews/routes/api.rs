//! JSON API handlers for the reviews module.

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::json;
use time::OffsetDateTime;

use bookhub_authz::Identity;
use bookhub_http::error::AppError;

use super::ReviewsState;
use crate::modules::reviews::models::{CreateReview, NewReview, Review, ReviewProjection, VoteInput};

/// GET /api/reviews/book/{bookId}
pub async fn reviews_for_book(
    State(state): State<ReviewsState>,
    Path(book_id): Path<i64>,
) -> Result<Json<Vec<ReviewProjection>>, AppError> {
    let book = state
        .books
        .get_by_id(book_id)
        .await?
        .ok_or_else(|| AppError::not_found("Book not found."))?;

    Ok(Json(
        book.reviews
            .into_iter()
            .map(ReviewProjection::from)
            .collect(),
    ))
}

/// POST /api/reviews
pub async fn create_review(
    State(state): State<ReviewsState>,
    identity: Identity,
    Json(dto): Json<CreateReview>,
) -> Result<Json<Review>, AppError> {
    let errors = dto.validate();
    if !errors.is_empty() {
        return Err(AppError::validation(errors, "Validation failed"));
    }

    if !state.books.exists(dto.book_id).await? {
        return Err(AppError::not_found("Book not found."));
    }

    let review = state
        .reviews
        .add(NewReview {
            content: dto.content,
            rating: dto.rating.expect("validated above"),
            date_created: OffsetDateTime::now_utc(),
            book_id: dto.book_id,
            user_id: identity.0,
        })
        .await?;

    Ok(Json(review))
}

/// POST /api/reviews/{id}/vote
pub async fn vote(
    State(state): State<ReviewsState>,
    identity: Identity,
    Path(id): Path<i64>,
    Json(dto): Json<VoteInput>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !state.reviews.exists(id).await? {
        return Err(AppError::not_found("Review not found."));
    }

    state
        .reviews
        .upsert_vote(id, identity.user_id(), dto.is_upvote)
        .await?;

    Ok(Json(json!({"success": true})))
}

/// Module health probe.
pub async fn health_check() -> &'static str {
    "reviews module is healthy"
}
