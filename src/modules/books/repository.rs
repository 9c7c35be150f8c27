use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::SqlitePool;

use super::models::{Book, BookFilter, NewBook};
use crate::modules::reviews::models::Review;

/// Store-facing capability set for books. Concrete implementations
/// talk to SQLite; tests substitute doubles.
#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn get_all(&self) -> anyhow::Result<Vec<Book>>;

    async fn get_by_id(&self, id: i64) -> anyhow::Result<Option<Book>>;

    async fn add(&self, book: NewBook) -> anyhow::Result<Book>;

    /// Persist changed fields for an existing book. Returns false when
    /// no row matched the id (e.g. it was concurrently deleted).
    async fn update(&self, book: &Book) -> anyhow::Result<bool>;

    /// Delete by id; absent ids are a no-op, not an error.
    async fn delete(&self, id: i64) -> anyhow::Result<()>;

    /// Books matching every supplied predicate. The rating predicate
    /// holds when at least one review carries exactly that rating.
    async fn get_filtered(&self, filter: &BookFilter) -> anyhow::Result<Vec<Book>>;

    async fn exists(&self, id: i64) -> anyhow::Result<bool>;

    /// Duplicate detection for the API create path.
    async fn title_author_exists(&self, title: &str, author: &str) -> anyhow::Result<bool>;
}

/// SQLite-backed implementation.
#[derive(Clone)]
pub struct SqliteBookRepository {
    pool: SqlitePool,
}

impl SqliteBookRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Eager-load reviews for the given books in one query.
    async fn attach_reviews(&self, mut books: Vec<Book>) -> anyhow::Result<Vec<Book>> {
        if books.is_empty() {
            return Ok(books);
        }

        let placeholders = vec!["?"; books.len()].join(", ");
        let sql = format!(
            "SELECT id, content, rating, date_created, book_id, user_id \
             FROM reviews WHERE book_id IN ({placeholders}) ORDER BY id"
        );

        let mut query = sqlx::query_as::<_, Review>(&sql);
        for book in &books {
            query = query.bind(book.id);
        }
        let reviews = query.fetch_all(&self.pool).await?;

        let mut by_book: HashMap<i64, Vec<Review>> = HashMap::new();
        for review in reviews {
            by_book.entry(review.book_id).or_default().push(review);
        }
        for book in &mut books {
            book.reviews = by_book.remove(&book.id).unwrap_or_default();
        }

        Ok(books)
    }
}

#[async_trait]
impl BookRepository for SqliteBookRepository {
    async fn get_all(&self) -> anyhow::Result<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            "SELECT id, title, author, published_year, genre, user_id FROM books ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        self.attach_reviews(books).await
    }

    async fn get_by_id(&self, id: i64) -> anyhow::Result<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(
            "SELECT id, title, author, published_year, genre, user_id FROM books WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match book {
            Some(book) => {
                let mut loaded = self.attach_reviews(vec![book]).await?;
                Ok(loaded.pop())
            }
            None => Ok(None),
        }
    }

    async fn add(&self, book: NewBook) -> anyhow::Result<Book> {
        let result = sqlx::query(
            "INSERT INTO books (title, author, published_year, genre, user_id) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.published_year)
        .bind(&book.genre)
        .bind(&book.user_id)
        .execute(&self.pool)
        .await?;

        Ok(Book {
            id: result.last_insert_rowid(),
            title: book.title,
            author: book.author,
            published_year: book.published_year,
            genre: book.genre,
            user_id: book.user_id,
            reviews: Vec::new(),
        })
    }

    async fn update(&self, book: &Book) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE books SET title = ?, author = ?, published_year = ?, genre = ?, user_id = ? \
             WHERE id = ?",
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.published_year)
        .bind(&book.genre)
        .bind(&book.user_id)
        .bind(book.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: i64) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get_filtered(&self, filter: &BookFilter) -> anyhow::Result<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            "SELECT id, title, author, published_year, genre, user_id FROM books \
             WHERE (?1 IS NULL OR genre = ?1) \
               AND (?2 IS NULL OR published_year = ?2) \
               AND (?3 IS NULL OR EXISTS ( \
                   SELECT 1 FROM reviews r WHERE r.book_id = books.id AND r.rating = ?3)) \
             ORDER BY id",
        )
        .bind(filter.genre.as_deref())
        .bind(filter.year)
        .bind(filter.rating)
        .fetch_all(&self.pool)
        .await?;

        self.attach_reviews(books).await
    }

    async fn exists(&self, id: i64) -> anyhow::Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = ?)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    async fn title_author_exists(&self, title: &str, author: &str) -> anyhow::Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM books WHERE title = ? AND author = ?)",
        )
        .bind(title)
        .bind(author)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::reviews::models::NewReview;
    use crate::modules::reviews::repository::{ReviewRepository, SqliteReviewRepository};
    use crate::modules::test_support::test_pool;
    use time::OffsetDateTime;

    fn new_book(title: &str, genre: &str, year: i32) -> NewBook {
        NewBook {
            title: title.to_string(),
            author: "Author".to_string(),
            published_year: year,
            genre: genre.to_string(),
            user_id: "user-1".to_string(),
        }
    }

    async fn add_review(pool: &SqlitePool, book_id: i64, rating: i32) {
        let reviews = SqliteReviewRepository::new(pool.clone());
        reviews
            .add(NewReview {
                content: "text".to_string(),
                rating,
                date_created: OffsetDateTime::UNIX_EPOCH,
                book_id,
                user_id: "reviewer".to_string(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn add_assigns_id_and_get_all_round_trips() {
        let pool = test_pool().await;
        let repo = SqliteBookRepository::new(pool);

        let created = repo.add(new_book("Test", "Fiction", 2020)).await.unwrap();
        assert!(created.id > 0);

        let all = repo.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Test");
    }

    #[tokio::test]
    async fn get_by_id_returns_none_when_missing() {
        let pool = test_pool().await;
        let repo = SqliteBookRepository::new(pool);

        let found = repo.get_by_id(123).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn get_by_id_eager_loads_reviews() {
        let pool = test_pool().await;
        let repo = SqliteBookRepository::new(pool.clone());

        let book = repo.add(new_book("A", "Fiction", 2020)).await.unwrap();
        add_review(&pool, book.id, 5).await;
        add_review(&pool, book.id, 3).await;

        let found = repo.get_by_id(book.id).await.unwrap().unwrap();
        assert_eq!(found.reviews.len(), 2);
    }

    #[tokio::test]
    async fn update_persists_changes() {
        let pool = test_pool().await;
        let repo = SqliteBookRepository::new(pool);

        let mut book = repo.add(new_book("Old", "Fiction", 2020)).await.unwrap();
        book.title = "New".to_string();

        let updated = repo.update(&book).await.unwrap();
        assert!(updated);

        let found = repo.get_by_id(book.id).await.unwrap().unwrap();
        assert_eq!(found.title, "New");
    }

    #[tokio::test]
    async fn update_of_missing_row_reports_false() {
        let pool = test_pool().await;
        let repo = SqliteBookRepository::new(pool);

        let ghost = Book {
            id: 999,
            title: "T".to_string(),
            author: "A".to_string(),
            published_year: 2020,
            genre: "Fiction".to_string(),
            user_id: "user-1".to_string(),
            reviews: Vec::new(),
        };
        let updated = repo.update(&ghost).await.unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn delete_removes_book_and_is_noop_when_missing() {
        let pool = test_pool().await;
        let repo = SqliteBookRepository::new(pool);

        let book = repo.add(new_book("A", "Fiction", 2020)).await.unwrap();
        repo.delete(book.id).await.unwrap();
        assert!(repo.get_by_id(book.id).await.unwrap().is_none());

        // Absent id: no error.
        repo.delete(book.id).await.unwrap();
    }

    #[tokio::test]
    async fn filter_combines_genre_year_and_rating() {
        let pool = test_pool().await;
        let repo = SqliteBookRepository::new(pool.clone());

        let a = repo.add(new_book("A", "Fiction", 2020)).await.unwrap();
        let b = repo.add(new_book("B", "Drama", 2021)).await.unwrap();
        add_review(&pool, a.id, 5).await;
        add_review(&pool, b.id, 3).await;

        let filter = BookFilter {
            genre: Some("Fiction".to_string()),
            year: Some(2020),
            rating: Some(5),
        };
        let filtered = repo.get_filtered(&filter).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].title, "A");
    }

    #[tokio::test]
    async fn absent_predicates_impose_no_constraint() {
        let pool = test_pool().await;
        let repo = SqliteBookRepository::new(pool);

        repo.add(new_book("A", "Fiction", 2020)).await.unwrap();
        repo.add(new_book("B", "Drama", 2021)).await.unwrap();

        let filtered = repo.get_filtered(&BookFilter::default()).await.unwrap();
        assert_eq!(filtered.len(), 2);
    }

    #[tokio::test]
    async fn rating_filter_matches_any_single_review() {
        let pool = test_pool().await;
        let repo = SqliteBookRepository::new(pool.clone());

        // Ratings 2 and 5: one matching review qualifies the book even
        // though the average is 3.5.
        let a = repo.add(new_book("A", "Fiction", 2020)).await.unwrap();
        add_review(&pool, a.id, 2).await;
        add_review(&pool, a.id, 5).await;

        let filter = BookFilter {
            genre: None,
            year: None,
            rating: Some(5),
        };
        let filtered = repo.get_filtered(&filter).await.unwrap();
        assert_eq!(filtered.len(), 1);

        let filter = BookFilter {
            rating: Some(4),
            ..BookFilter::default()
        };
        assert!(repo.get_filtered(&filter).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn exists_and_duplicate_detection() {
        let pool = test_pool().await;
        let repo = SqliteBookRepository::new(pool);

        let book = repo.add(new_book("A", "Fiction", 2020)).await.unwrap();
        assert!(repo.exists(book.id).await.unwrap());
        assert!(!repo.exists(book.id + 1).await.unwrap());

        assert!(repo.title_author_exists("A", "Author").await.unwrap());
        assert!(!repo.title_author_exists("A", "Someone").await.unwrap());
    }
}
