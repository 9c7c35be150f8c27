use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::modules::reviews::models::{Review, ReviewProjection};

/// A book in the catalog. Reviews are eager-loaded on every read.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub published_year: i32,
    pub genre: String,
    /// Identity of the creating user; stamped at creation, never
    /// user-editable afterwards.
    pub user_id: String,
    #[sqlx(skip)]
    #[serde(default)]
    pub reviews: Vec<Review>,
}

/// Fields for a book not yet persisted; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub published_year: i32,
    pub genre: String,
    pub user_id: String,
}

/// Optional predicates for the filtered book listing. Absent
/// predicates impose no constraint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookFilter {
    pub genre: Option<String>,
    pub year: Option<i32>,
    /// Matches books having at least one review with exactly this
    /// rating (not an average).
    pub rating: Option<i32>,
}

/// Raw query-string form of [`BookFilter`]; empty values act as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookFilterQuery {
    pub genre: Option<String>,
    pub year: Option<String>,
    pub rating: Option<String>,
}

impl BookFilterQuery {
    pub fn parse(self) -> Result<BookFilter, bookhub_http::error::AppError> {
        Ok(BookFilter {
            genre: self.genre.filter(|g| !g.is_empty()),
            year: parse_optional_int(self.year, "year")?,
            rating: parse_optional_int(self.rating, "rating")?,
        })
    }
}

fn parse_optional_int(
    value: Option<String>,
    field: &str,
) -> Result<Option<i32>, bookhub_http::error::AppError> {
    match value {
        None => Ok(None),
        Some(raw) if raw.is_empty() => Ok(None),
        Some(raw) => raw.parse::<i32>().map(Some).map_err(|_| {
            bookhub_http::error::AppError::bad_request(format!("{field} must be an integer"))
        }),
    }
}

/// JSON body for creating a book through the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBook {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub published_year: Option<i32>,
    #[serde(default)]
    pub genre: String,
}

impl CreateBook {
    /// Field-level validation; returns one detail entry per failure.
    pub fn validate(&self) -> Vec<serde_json::Value> {
        let mut errors = Vec::new();
        if self.title.trim().is_empty() {
            errors.push(json!({"field": "title", "error": "required"}));
        }
        if self.author.trim().is_empty() {
            errors.push(json!({"field": "author", "error": "required"}));
        }
        if self.published_year.is_none() {
            errors.push(json!({"field": "publishedYear", "error": "required"}));
        }
        if self.genre.trim().is_empty() {
            errors.push(json!({"field": "genre", "error": "required"}));
        }
        errors
    }
}

/// Form body for the web create/edit paths. The year arrives as text
/// so that an empty field reads as missing rather than unparseable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookForm {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub published_year: Option<String>,
    #[serde(default)]
    pub genre: String,
}

impl BookForm {
    /// Validate and parse; `Err` carries the per-field error details.
    pub fn validate(&self) -> Result<ValidatedBookForm, Vec<serde_json::Value>> {
        let mut errors = Vec::new();
        if self.title.trim().is_empty() {
            errors.push(json!({"field": "title", "error": "required"}));
        }
        if self.author.trim().is_empty() {
            errors.push(json!({"field": "author", "error": "required"}));
        }
        let published_year = match self.published_year.as_deref().map(str::trim) {
            None | Some("") => {
                errors.push(json!({"field": "publishedYear", "error": "required"}));
                None
            }
            Some(raw) => match raw.parse::<i32>() {
                Ok(year) => Some(year),
                Err(_) => {
                    errors.push(json!({"field": "publishedYear", "error": "must be a number"}));
                    None
                }
            },
        };
        if self.genre.trim().is_empty() {
            errors.push(json!({"field": "genre", "error": "required"}));
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(ValidatedBookForm {
            id: self.id,
            title: self.title.trim().to_string(),
            author: self.author.trim().to_string(),
            published_year: published_year.expect("validated above"),
            genre: self.genre.trim().to_string(),
        })
    }
}

/// A [`BookForm`] that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedBookForm {
    pub id: Option<i64>,
    pub title: String,
    pub author: String,
    pub published_year: i32,
    pub genre: String,
}

/// List projection exposed by `GET /api/books`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSummary {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub published_year: i32,
    pub genre: String,
    pub average_rating: f64,
}

impl From<Book> for BookSummary {
    fn from(book: Book) -> Self {
        let average_rating = average_rating(&book.reviews);
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            published_year: book.published_year,
            genre: book.genre,
            average_rating,
        }
    }
}

/// Detail projection exposed by `GET /api/books/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDetail {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub published_year: i32,
    pub genre: String,
    pub reviews: Vec<ReviewProjection>,
}

impl From<Book> for BookDetail {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            published_year: book.published_year,
            genre: book.genre,
            reviews: book
                .reviews
                .into_iter()
                .map(ReviewProjection::from)
                .collect(),
        }
    }
}

/// Arithmetic mean of review ratings; 0.0 when there are none.
pub fn average_rating(reviews: &[Review]) -> f64 {
    if reviews.is_empty() {
        return 0.0;
    }
    reviews.iter().map(|r| f64::from(r.rating)).sum::<f64>() / reviews.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn review(rating: i32) -> Review {
        Review {
            id: 0,
            content: "text".to_string(),
            rating,
            date_created: OffsetDateTime::UNIX_EPOCH,
            book_id: 1,
            user_id: "user-1".to_string(),
            book: None,
        }
    }

    #[test]
    fn average_of_no_reviews_is_zero() {
        assert_eq!(average_rating(&[]), 0.0);
    }

    #[test]
    fn average_of_five_and_three_is_four() {
        let reviews = vec![review(5), review(3)];
        assert_eq!(average_rating(&reviews), 4.0);
    }

    #[test]
    fn create_book_requires_all_fields() {
        let dto = CreateBook {
            title: String::new(),
            author: "A".to_string(),
            published_year: None,
            genre: "Fiction".to_string(),
        };
        let errors = dto.validate();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn filter_query_treats_empty_values_as_absent() {
        let query = BookFilterQuery {
            genre: Some(String::new()),
            year: Some(String::new()),
            rating: None,
        };
        let filter = query.parse().unwrap();
        assert_eq!(filter, BookFilter::default());
    }

    #[test]
    fn filter_query_rejects_non_numeric_year() {
        let query = BookFilterQuery {
            genre: None,
            year: Some("abc".to_string()),
            rating: None,
        };
        assert!(query.parse().is_err());
    }

    #[test]
    fn book_form_collects_all_errors() {
        let form = BookForm {
            id: None,
            title: String::new(),
            author: String::new(),
            published_year: Some("not-a-year".to_string()),
            genre: String::new(),
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn book_form_parses_year() {
        let form = BookForm {
            id: Some(3),
            title: "T".to_string(),
            author: "A".to_string(),
            published_year: Some("1980".to_string()),
            genre: "Novel".to_string(),
        };
        let validated = form.validate().unwrap();
        assert_eq!(validated.published_year, 1980);
        assert_eq!(validated.id, Some(3));
    }
}
