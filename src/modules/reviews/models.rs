use serde::{Deserialize, Serialize};
use serde_json::json;
use time::OffsetDateTime;

use crate::modules::books::models::Book;

/// A review of a book. Reads eager-load the parent book reference
/// (the parent arrives without its own review collection).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: i64,
    pub content: String,
    /// Integer rating, 1 through 5 inclusive.
    pub rating: i32,
    /// Server-assigned UTC creation timestamp.
    #[serde(with = "time::serde::rfc3339")]
    pub date_created: OffsetDateTime,
    pub book_id: i64,
    /// Identity of the review author; immutable after creation.
    pub user_id: String,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub book: Option<Book>,
}

/// Fields for a review not yet persisted.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub content: String,
    pub rating: i32,
    pub date_created: OffsetDateTime,
    pub book_id: i64,
    pub user_id: String,
}

/// One user's vote on one review.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReviewVote {
    pub id: i64,
    pub review_id: i64,
    pub user_id: String,
    pub is_upvote: bool,
}

/// API projection of a review as nested under a book.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewProjection {
    pub id: i64,
    pub content: String,
    pub rating: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub date_created: OffsetDateTime,
    pub user_id: String,
}

impl From<Review> for ReviewProjection {
    fn from(review: Review) -> Self {
        Self {
            id: review.id,
            content: review.content,
            rating: review.rating,
            date_created: review.date_created,
            user_id: review.user_id,
        }
    }
}

pub const CONTENT_REQUIRED: &str = "Content is required.";
pub const RATING_OUT_OF_RANGE: &str = "Rating must be between 1 and 5.";

fn rating_in_range(rating: i32) -> bool {
    (1..=5).contains(&rating)
}

/// JSON body for creating a review through the API. A missing bookId
/// reads as 0, which no book carries, so lookup reports not-found.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReview {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub rating: Option<i32>,
    #[serde(default)]
    pub book_id: i64,
}

impl CreateReview {
    pub fn validate(&self) -> Vec<serde_json::Value> {
        let mut errors = Vec::new();
        if self.content.trim().is_empty() {
            errors.push(json!({"field": "content", "error": CONTENT_REQUIRED}));
        }
        match self.rating {
            Some(rating) if rating_in_range(rating) => {}
            _ => errors.push(json!({"field": "rating", "error": RATING_OUT_OF_RANGE})),
        }
        errors
    }
}

/// Form body for the web create/edit paths. The rating arrives as
/// text so an empty field reads as missing rather than unparseable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewForm {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub book_id: Option<i64>,
}

impl ReviewForm {
    /// Validate and parse; `Err` carries aggregated error messages for
    /// re-rendering the owning book's page.
    pub fn validate(&self) -> Result<ValidatedReviewForm, Vec<String>> {
        let mut errors = Vec::new();
        if self.content.trim().is_empty() {
            errors.push(CONTENT_REQUIRED.to_string());
        }
        let rating = match self
            .rating
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::parse::<i32>)
        {
            Some(Ok(rating)) if rating_in_range(rating) => Some(rating),
            _ => {
                errors.push(RATING_OUT_OF_RANGE.to_string());
                None
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(ValidatedReviewForm {
            id: self.id,
            content: self.content.trim().to_string(),
            rating: rating.expect("validated above"),
            book_id: self.book_id,
        })
    }
}

/// A [`ReviewForm`] that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedReviewForm {
    pub id: Option<i64>,
    pub content: String,
    pub rating: i32,
    pub book_id: Option<i64>,
}

/// JSON body for casting a vote. A missing flag reads as a downvote.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteInput {
    #[serde(default)]
    pub is_upvote: bool,
}

/// Form body for the web vote path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteForm {
    pub review_id: i64,
    #[serde(default)]
    pub is_upvote: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dto(content: &str, rating: Option<i32>) -> CreateReview {
        CreateReview {
            content: content.to_string(),
            rating,
            book_id: 1,
        }
    }

    #[test]
    fn rating_boundaries_accepted() {
        assert!(dto("good", Some(1)).validate().is_empty());
        assert!(dto("good", Some(5)).validate().is_empty());
    }

    #[test]
    fn rating_zero_and_six_rejected() {
        assert_eq!(dto("good", Some(0)).validate().len(), 1);
        assert_eq!(dto("good", Some(6)).validate().len(), 1);
        assert_eq!(dto("good", None).validate().len(), 1);
    }

    #[test]
    fn empty_content_rejected() {
        let errors = dto("   ", Some(3)).validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0]["error"], CONTENT_REQUIRED);
    }

    #[test]
    fn form_aggregates_messages() {
        let form = ReviewForm {
            id: None,
            content: String::new(),
            rating: Some("9".to_string()),
            book_id: Some(1),
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(
            errors,
            vec![CONTENT_REQUIRED.to_string(), RATING_OUT_OF_RANGE.to_string()]
        );
    }

    #[test]
    fn form_parses_rating() {
        let form = ReviewForm {
            id: Some(7),
            content: "Excellent".to_string(),
            rating: Some("4".to_string()),
            book_id: Some(2),
        };
        let valid = form.validate().unwrap();
        assert_eq!(valid.rating, 4);
        assert_eq!(valid.book_id, Some(2));
    }
}
