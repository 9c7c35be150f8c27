use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::SqlitePool;

use super::models::{NewReview, Review, ReviewVote};
use crate::modules::books::models::Book;

/// Store-facing capability set for reviews and their votes.
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn get_all(&self) -> anyhow::Result<Vec<Review>>;

    async fn get_by_id(&self, id: i64) -> anyhow::Result<Option<Review>>;

    async fn add(&self, review: NewReview) -> anyhow::Result<Review>;

    /// Persist changed fields for an existing review. Returns false
    /// when no row matched the id.
    async fn update(&self, review: &Review) -> anyhow::Result<bool>;

    /// Delete by id; absent ids are a no-op, not an error.
    async fn delete(&self, id: i64) -> anyhow::Result<()>;

    async fn get_by_book_id(&self, book_id: i64) -> anyhow::Result<Vec<Review>>;

    async fn exists(&self, id: i64) -> anyhow::Result<bool>;

    /// Record one user's vote on one review: a single atomic
    /// insert-or-update over the (review_id, user_id) uniqueness
    /// constraint, so concurrent casts cannot produce duplicates.
    async fn upsert_vote(
        &self,
        review_id: i64,
        user_id: &str,
        is_upvote: bool,
    ) -> anyhow::Result<()>;

    async fn votes_for_review(&self, review_id: i64) -> anyhow::Result<Vec<ReviewVote>>;
}

/// SQLite-backed implementation.
#[derive(Clone)]
pub struct SqliteReviewRepository {
    pool: SqlitePool,
}

impl SqliteReviewRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Eager-load the parent book reference in one query. The parent
    /// arrives without its own review collection.
    async fn attach_books(&self, mut reviews: Vec<Review>) -> anyhow::Result<Vec<Review>> {
        if reviews.is_empty() {
            return Ok(reviews);
        }

        let placeholders = vec!["?"; reviews.len()].join(", ");
        let sql = format!(
            "SELECT id, title, author, published_year, genre, user_id \
             FROM books WHERE id IN ({placeholders})"
        );

        let mut query = sqlx::query_as::<_, Book>(&sql);
        for review in &reviews {
            query = query.bind(review.book_id);
        }
        let books = query.fetch_all(&self.pool).await?;

        let by_id: HashMap<i64, Book> = books.into_iter().map(|b| (b.id, b)).collect();
        for review in &mut reviews {
            review.book = by_id.get(&review.book_id).cloned();
        }

        Ok(reviews)
    }
}

#[async_trait]
impl ReviewRepository for SqliteReviewRepository {
    async fn get_all(&self) -> anyhow::Result<Vec<Review>> {
        let reviews = sqlx::query_as::<_, Review>(
            "SELECT id, content, rating, date_created, book_id, user_id \
             FROM reviews ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        self.attach_books(reviews).await
    }

    async fn get_by_id(&self, id: i64) -> anyhow::Result<Option<Review>> {
        let review = sqlx::query_as::<_, Review>(
            "SELECT id, content, rating, date_created, book_id, user_id \
             FROM reviews WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match review {
            Some(review) => {
                let mut loaded = self.attach_books(vec![review]).await?;
                Ok(loaded.pop())
            }
            None => Ok(None),
        }
    }

    async fn add(&self, review: NewReview) -> anyhow::Result<Review> {
        let result = sqlx::query(
            "INSERT INTO reviews (content, rating, date_created, book_id, user_id) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&review.content)
        .bind(review.rating)
        .bind(review.date_created)
        .bind(review.book_id)
        .bind(&review.user_id)
        .execute(&self.pool)
        .await?;

        Ok(Review {
            id: result.last_insert_rowid(),
            content: review.content,
            rating: review.rating,
            date_created: review.date_created,
            book_id: review.book_id,
            user_id: review.user_id,
            book: None,
        })
    }

    async fn update(&self, review: &Review) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE reviews SET content = ?, rating = ?, date_created = ?, book_id = ?, \
             user_id = ? WHERE id = ?",
        )
        .bind(&review.content)
        .bind(review.rating)
        .bind(review.date_created)
        .bind(review.book_id)
        .bind(&review.user_id)
        .bind(review.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: i64) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM reviews WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get_by_book_id(&self, book_id: i64) -> anyhow::Result<Vec<Review>> {
        let reviews = sqlx::query_as::<_, Review>(
            "SELECT id, content, rating, date_created, book_id, user_id \
             FROM reviews WHERE book_id = ? ORDER BY id",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        self.attach_books(reviews).await
    }

    async fn exists(&self, id: i64) -> anyhow::Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM reviews WHERE id = ?)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    async fn upsert_vote(
        &self,
        review_id: i64,
        user_id: &str,
        is_upvote: bool,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO review_votes (review_id, user_id, is_upvote) VALUES (?, ?, ?) \
             ON CONFLICT(review_id, user_id) DO UPDATE SET is_upvote = excluded.is_upvote",
        )
        .bind(review_id)
        .bind(user_id)
        .bind(is_upvote)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn votes_for_review(&self, review_id: i64) -> anyhow::Result<Vec<ReviewVote>> {
        let votes = sqlx::query_as::<_, ReviewVote>(
            "SELECT id, review_id, user_id, is_upvote FROM review_votes \
             WHERE review_id = ? ORDER BY id",
        )
        .bind(review_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(votes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::models::NewBook;
    use crate::modules::books::repository::{BookRepository, SqliteBookRepository};
    use crate::modules::test_support::test_pool;
    use time::OffsetDateTime;

    async fn seed_book(pool: &SqlitePool, title: &str) -> Book {
        let books = SqliteBookRepository::new(pool.clone());
        books
            .add(NewBook {
                title: title.to_string(),
                author: "Author".to_string(),
                published_year: 2020,
                genre: "Fiction".to_string(),
                user_id: "owner".to_string(),
            })
            .await
            .unwrap()
    }

    fn new_review(book_id: i64, rating: i32) -> NewReview {
        NewReview {
            content: "Worth reading".to_string(),
            rating,
            date_created: OffsetDateTime::UNIX_EPOCH,
            book_id,
            user_id: "reviewer".to_string(),
        }
    }

    #[tokio::test]
    async fn add_and_get_by_id_eager_loads_parent_book() {
        let pool = test_pool().await;
        let book = seed_book(&pool, "Parent").await;
        let repo = SqliteReviewRepository::new(pool);

        let created = repo.add(new_review(book.id, 4)).await.unwrap();
        assert!(created.id > 0);

        let found = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.rating, 4);
        assert_eq!(found.book.as_ref().unwrap().title, "Parent");
    }

    #[tokio::test]
    async fn get_by_id_returns_none_when_missing() {
        let pool = test_pool().await;
        let repo = SqliteReviewRepository::new(pool);

        assert!(repo.get_by_id(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_by_book_id_scopes_to_one_book() {
        let pool = test_pool().await;
        let first = seed_book(&pool, "First").await;
        let second = seed_book(&pool, "Second").await;
        let repo = SqliteReviewRepository::new(pool);

        repo.add(new_review(first.id, 5)).await.unwrap();
        repo.add(new_review(first.id, 3)).await.unwrap();
        repo.add(new_review(second.id, 1)).await.unwrap();

        let reviews = repo.get_by_book_id(first.id).await.unwrap();
        assert_eq!(reviews.len(), 2);
        assert!(reviews.iter().all(|r| r.book_id == first.id));
    }

    #[tokio::test]
    async fn update_of_missing_row_reports_false() {
        let pool = test_pool().await;
        let repo = SqliteReviewRepository::new(pool);

        let ghost = Review {
            id: 404,
            content: "x".to_string(),
            rating: 3,
            date_created: OffsetDateTime::UNIX_EPOCH,
            book_id: 1,
            user_id: "reviewer".to_string(),
            book: None,
        };
        assert!(!repo.update(&ghost).await.unwrap());
    }

    #[tokio::test]
    async fn delete_is_noop_when_missing() {
        let pool = test_pool().await;
        let repo = SqliteReviewRepository::new(pool);

        repo.delete(123).await.unwrap();
    }

    #[tokio::test]
    async fn store_rejects_out_of_range_rating() {
        let pool = test_pool().await;
        let book = seed_book(&pool, "Checked").await;
        let repo = SqliteReviewRepository::new(pool);

        // DTO validation is the first line; the CHECK constraint backs it up.
        assert!(repo.add(new_review(book.id, 0)).await.is_err());
        assert!(repo.add(new_review(book.id, 6)).await.is_err());
    }

    #[tokio::test]
    async fn deleting_book_cascades_to_reviews() {
        let pool = test_pool().await;
        let book = seed_book(&pool, "Doomed").await;
        let books = SqliteBookRepository::new(pool.clone());
        let repo = SqliteReviewRepository::new(pool);

        let review = repo.add(new_review(book.id, 2)).await.unwrap();
        books.delete(book.id).await.unwrap();

        assert!(repo.get_by_id(review.id).await.unwrap().is_none());
        assert!(repo.get_by_book_id(book.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn voting_twice_keeps_one_row_with_latest_flag() {
        let pool = test_pool().await;
        let book = seed_book(&pool, "Voted").await;
        let repo = SqliteReviewRepository::new(pool);
        let review = repo.add(new_review(book.id, 5)).await.unwrap();

        repo.upsert_vote(review.id, "voter", true).await.unwrap();
        repo.upsert_vote(review.id, "voter", false).await.unwrap();

        let votes = repo.votes_for_review(review.id).await.unwrap();
        assert_eq!(votes.len(), 1);
        assert!(!votes[0].is_upvote);
    }

    #[tokio::test]
    async fn different_users_vote_independently() {
        let pool = test_pool().await;
        let book = seed_book(&pool, "Popular").await;
        let repo = SqliteReviewRepository::new(pool);
        let review = repo.add(new_review(book.id, 5)).await.unwrap();

        repo.upsert_vote(review.id, "alice", true).await.unwrap();
        repo.upsert_vote(review.id, "bob", false).await.unwrap();

        let votes = repo.votes_for_review(review.id).await.unwrap();
        assert_eq!(votes.len(), 2);
    }
}
