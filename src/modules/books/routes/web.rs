//! Web (form + redirect) handlers for the books module. View rendering
//! happens in an external layer; GET handlers return view models and
//! successful mutations answer with redirects.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use serde_json::json;

use bookhub_authz::{ensure_owner, Identity};
use bookhub_http::error::AppError;

use super::BooksState;
use crate::modules::books::models::{Book, BookFilterQuery, BookForm, NewBook};

/// GET /books?genre=&year=&rating=
pub async fn list(
    State(state): State<BooksState>,
    Query(query): Query<BookFilterQuery>,
) -> Result<Json<Vec<Book>>, AppError> {
    let filter = query.parse()?;
    let books = state.books.get_filtered(&filter).await?;
    Ok(Json(books))
}

/// GET /books/details/{id}
pub async fn details(
    State(state): State<BooksState>,
    Path(id): Path<i64>,
) -> Result<Json<Book>, AppError> {
    let book = state
        .books
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Book not found."))?;
    Ok(Json(book))
}

/// GET /books/create — empty form view model.
pub async fn create_form() -> Json<BookForm> {
    Json(BookForm {
        id: None,
        title: String::new(),
        author: String::new(),
        published_year: None,
        genre: String::new(),
    })
}

/// POST /books/create
pub async fn create(
    State(state): State<BooksState>,
    identity: Identity,
    Form(form): Form<BookForm>,
) -> Result<Response, AppError> {
    let valid = match form.validate() {
        Ok(valid) => valid,
        Err(errors) => return Ok(form_errors(&form, errors)),
    };

    state
        .books
        .add(NewBook {
            title: valid.title,
            author: valid.author,
            published_year: valid.published_year,
            genre: valid.genre,
            user_id: identity.0,
        })
        .await?;

    Ok(Redirect::to("/books").into_response())
}

/// GET /books/edit/{id}
pub async fn edit_form(
    State(state): State<BooksState>,
    identity: Identity,
    Path(id): Path<i64>,
) -> Result<Json<Book>, AppError> {
    let book = state
        .books
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Book not found."))?;

    ensure_owner(&book.user_id, &identity)?;

    Ok(Json(book))
}

/// POST /books/edit/{id}
pub async fn edit(
    State(state): State<BooksState>,
    identity: Identity,
    Path(id): Path<i64>,
    Form(form): Form<BookForm>,
) -> Result<Response, AppError> {
    if form.id != Some(id) {
        return Err(AppError::not_found("Book not found."));
    }

    let existing = state
        .books
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Book not found."))?;

    ensure_owner(&existing.user_id, &identity)?;

    let valid = match form.validate() {
        Ok(valid) => valid,
        Err(errors) => return Ok(form_errors(&form, errors)),
    };

    // Ownership field is preserved; callers cannot reassign it.
    let updated = Book {
        id,
        title: valid.title,
        author: valid.author,
        published_year: valid.published_year,
        genre: valid.genre,
        user_id: existing.user_id,
        reviews: Vec::new(),
    };

    // The row vanishing between the read and the write reads as NotFound.
    if !state.books.update(&updated).await? {
        return Err(AppError::not_found("Book not found."));
    }

    Ok(Redirect::to("/books").into_response())
}

/// GET /books/delete/{id} — confirmation view model.
pub async fn delete_confirm(
    State(state): State<BooksState>,
    identity: Identity,
    Path(id): Path<i64>,
) -> Result<Json<Book>, AppError> {
    let book = state
        .books
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Book not found."))?;

    ensure_owner(&book.user_id, &identity)?;

    Ok(Json(book))
}

/// POST /books/delete/{id}
///
/// Deletes only when the caller owns the book, then redirects to the
/// list either way. The non-owner path intentionally stays silent so
/// the response does not distinguish existence from ownership.
pub async fn delete(
    State(state): State<BooksState>,
    identity: Option<Identity>,
    Path(id): Path<i64>,
) -> Result<Redirect, AppError> {
    if let Some(identity) = identity {
        if let Some(book) = state.books.get_by_id(id).await? {
            if book.user_id == identity.user_id() {
                state.books.delete(id).await?;
            }
        }
    }

    Ok(Redirect::to("/books"))
}

/// GET /books/reviews/{id} — the book's review page view model.
pub async fn reviews_page(
    State(state): State<BooksState>,
    Path(id): Path<i64>,
) -> Result<Json<Book>, AppError> {
    let book = state
        .books
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("Book not found."))?;
    Ok(Json(book))
}

/// Validation failure: echo the submitted values next to the errors so
/// the renderer can re-fill the form.
fn form_errors(form: &BookForm, errors: Vec<serde_json::Value>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"values": form, "errors": errors})),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::routes::testing::{book, StubBooks};

    fn valid_form(id: Option<i64>) -> BookForm {
        BookForm {
            id,
            title: "Title".to_string(),
            author: "Author".to_string(),
            published_year: Some("2020".to_string()),
            genre: "Fiction".to_string(),
        }
    }

    #[tokio::test]
    async fn details_missing_book_is_not_found() {
        let stub = StubBooks::with_books(vec![]);
        let result = details(State(stub.state()), Path(1)).await;
        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn create_stamps_owner_and_redirects() {
        let stub = StubBooks::with_books(vec![]);
        let response = create(
            State(stub.state()),
            Identity("user-1".to_string()),
            Form(valid_form(None)),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let books = stub.books.lock().unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].user_id, "user-1");
    }

    #[tokio::test]
    async fn create_invalid_echoes_values_without_persisting() {
        let stub = StubBooks::with_books(vec![]);
        let form = BookForm {
            id: None,
            title: String::new(),
            author: "A".to_string(),
            published_year: None,
            genre: "Fiction".to_string(),
        };

        let response = create(State(stub.state()), Identity("user-1".to_string()), Form(form))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(stub.books.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn edit_id_mismatch_is_not_found() {
        let stub = StubBooks::with_books(vec![book(1, "owner")]);
        let result = edit(
            State(stub.state()),
            Identity("owner".to_string()),
            Path(1),
            Form(valid_form(Some(2))),
        )
        .await;

        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn edit_as_non_owner_is_unauthorized_and_mutates_nothing() {
        let stub = StubBooks::with_books(vec![book(1, "owner")]);
        let result = edit(
            State(stub.state()),
            Identity("intruder".to_string()),
            Path(1),
            Form(valid_form(Some(1))),
        )
        .await;

        assert!(matches!(result, Err(AppError::Unauthorized { .. })));
        assert!(stub.updates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn edit_preserves_stored_owner() {
        let stub = StubBooks::with_books(vec![book(1, "owner")]);
        let response = edit(
            State(stub.state()),
            Identity("owner".to_string()),
            Path(1),
            Form(valid_form(Some(1))),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let updates = stub.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].user_id, "owner");
        assert_eq!(updates[0].title, "Title");
    }

    #[tokio::test]
    async fn delete_by_owner_deletes_and_redirects() {
        let stub = StubBooks::with_books(vec![book(1, "owner")]);
        let redirect = delete(
            State(stub.state()),
            Some(Identity("owner".to_string())),
            Path(1),
        )
        .await
        .unwrap();

        assert_eq!(redirect.into_response().status(), StatusCode::SEE_OTHER);
        assert_eq!(*stub.deletes.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn delete_by_non_owner_silently_redirects() {
        let stub = StubBooks::with_books(vec![book(1, "owner")]);
        let redirect = delete(
            State(stub.state()),
            Some(Identity("intruder".to_string())),
            Path(1),
        )
        .await
        .unwrap();

        assert_eq!(redirect.into_response().status(), StatusCode::SEE_OTHER);
        assert!(stub.deletes.lock().unwrap().is_empty());
        assert_eq!(stub.books.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_without_identity_silently_redirects() {
        let stub = StubBooks::with_books(vec![book(1, "owner")]);
        let redirect = delete(State(stub.state()), None, Path(1)).await.unwrap();

        assert_eq!(redirect.into_response().status(), StatusCode::SEE_OTHER);
        assert!(stub.deletes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_confirm_guards_missing_and_foreign_books() {
        let stub = StubBooks::with_books(vec![book(1, "owner")]);

        let missing = delete_confirm(State(stub.state()), Identity("owner".to_string()), Path(9))
            .await;
        assert!(matches!(missing, Err(AppError::NotFound { .. })));

        let foreign =
            delete_confirm(State(stub.state()), Identity("intruder".to_string()), Path(1)).await;
        assert!(matches!(foreign, Err(AppError::Unauthorized { .. })));
    }
}
