//! Web (form + redirect) handlers for the reviews module.
//!
//! Ownership policy is uniform: only the authoring user may edit or
//! delete their review. The delete POST mirrors the books module's
//! silent no-op + redirect shape.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use serde_json::json;
use time::OffsetDateTime;

use bookhub_authz::{ensure_owner, Identity};
use bookhub_http::error::AppError;

use super::ReviewsState;
use crate::modules::reviews::models::{NewReview, Review, ReviewForm, VoteForm};

/// GET /reviews
pub async fn list(State(state): State<ReviewsState>) -> Result<Json<Vec<Review>>, AppError> {
    let reviews = state.reviews.get_all().await?;
    Ok(Json(reviews))
}

/// GET /reviews/details/{id}
pub async fn details(
    State(state): State<ReviewsState>,
    Path(id): Path<i64>,
) -> Result<Json<Review>, AppError> {
    let review = state
        .reviews
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Review not found."))?;
    Ok(Json(review))
}

/// POST /reviews/create
pub async fn create(
    State(state): State<ReviewsState>,
    identity: Identity,
    Form(form): Form<ReviewForm>,
) -> Result<Response, AppError> {
    let valid = match form.validate() {
        Ok(valid) => valid,
        Err(errors) => {
            // Re-render the owning book's page with the aggregated
            // messages; the book may be absent when the form was stale.
            let book_id = form.book_id.unwrap_or_default();
            let book = state.books.get_by_id(book_id).await?;
            return Ok((
                StatusCode::BAD_REQUEST,
                Json(json!({"book": book, "errors": errors})),
            )
                .into_response());
        }
    };

    let book_id = valid.book_id.unwrap_or_default();
    if !state.books.exists(book_id).await? {
        return Err(AppError::not_found("Book not found."));
    }

    state
        .reviews
        .add(NewReview {
            content: valid.content,
            rating: valid.rating,
            date_created: OffsetDateTime::now_utc(),
            book_id,
            user_id: identity.0,
        })
        .await?;

    Ok(Redirect::to(&format!("/books/reviews/{book_id}")).into_response())
}

/// GET /reviews/edit/{id}
pub async fn edit_form(
    State(state): State<ReviewsState>,
    identity: Identity,
    Path(id): Path<i64>,
) -> Result<Json<Review>, AppError> {
    let review = state
        .reviews
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Review not found."))?;

    ensure_owner(&review.user_id, &identity)?;

    Ok(Json(review))
}

/// POST /reviews/edit/{id}
pub async fn edit(
    State(state): State<ReviewsState>,
    identity: Identity,
    Path(id): Path<i64>,
    Form(form): Form<ReviewForm>,
) -> Result<Response, AppError> {
    if form.id != Some(id) {
        return Err(AppError::not_found("Review not found."));
    }

    let existing = state
        .reviews
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Review not found."))?;

    ensure_owner(&existing.user_id, &identity)?;

    let valid = match form.validate() {
        Ok(valid) => valid,
        Err(errors) => {
            return Ok((
                StatusCode::BAD_REQUEST,
                Json(json!({"values": form, "errors": errors})),
            )
                .into_response());
        }
    };

    // Author identity and creation time are immutable after creation.
    let updated = Review {
        id,
        content: valid.content,
        rating: valid.rating,
        date_created: existing.date_created,
        book_id: existing.book_id,
        user_id: existing.user_id,
        book: None,
    };

    if !state.reviews.update(&updated).await? {
        return Err(AppError::not_found("Review not found."));
    }

    Ok(Redirect::to("/reviews").into_response())
}

/// GET /reviews/delete/{id} — confirmation view model.
pub async fn delete_confirm(
    State(state): State<ReviewsState>,
    identity: Identity,
    Path(id): Path<i64>,
) -> Result<Json<Review>, AppError> {
    let review = state
        .reviews
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Review not found."))?;

    ensure_owner(&review.user_id, &identity)?;

    Ok(Json(review))
}

/// POST /reviews/delete/{id}
///
/// Deletes only when the caller authored the review, then redirects
/// either way — the same silent shape the books module uses.
pub async fn delete(
    State(state): State<ReviewsState>,
    identity: Option<Identity>,
    Path(id): Path<i64>,
) -> Result<Redirect, AppError> {
    if let Some(identity) = identity {
        if let Some(review) = state.reviews.get_by_id(id).await? {
            if review.user_id == identity.user_id() {
                state.reviews.delete(id).await?;
            }
        }
    }

    Ok(Redirect::to("/reviews"))
}

/// POST /reviews/vote
pub async fn vote(
    State(state): State<ReviewsState>,
    identity: Identity,
    Form(form): Form<VoteForm>,
) -> Result<Redirect, AppError> {
    let review = state
        .reviews
        .get_by_id(form.review_id)
        .await?
        .ok_or_else(|| AppError::not_found("Review not found."))?;

    state
        .reviews
        .upsert_vote(review.id, identity.user_id(), form.is_upvote)
        .await?;

    Ok(Redirect::to(&format!("/books/reviews/{}", review.book_id)))
}
