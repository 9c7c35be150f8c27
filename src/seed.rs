//! Startup seeding so a fresh local database is not empty.

use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::modules::books::models::NewBook;
use crate::modules::books::repository::{BookRepository, SqliteBookRepository};
use crate::modules::reviews::models::NewReview;
use crate::modules::reviews::repository::{ReviewRepository, SqliteReviewRepository};

const SEED_USER: &str = "seed-user";

/// Seed a small catalog. Skipped entirely when any book exists.
pub async fn seed(pool: &SqlitePool) -> anyhow::Result<()> {
    let books = SqliteBookRepository::new(pool.clone());
    let reviews = SqliteReviewRepository::new(pool.clone());

    if !books.get_all().await?.is_empty() {
        tracing::debug!("seed skipped: catalog already has books");
        return Ok(());
    }

    let seeds = [
        (
            NewBook {
                title: "The Name of the Rose".to_string(),
                author: "Umberto Eco".to_string(),
                published_year: 1980,
                genre: "Novel".to_string(),
                user_id: SEED_USER.to_string(),
            },
            ("Excellent Book!", 5),
        ),
        (
            NewBook {
                title: "The Little Prince".to_string(),
                author: "Antoine de Saint-Exupéry".to_string(),
                published_year: 1943,
                genre: "Children".to_string(),
                user_id: SEED_USER.to_string(),
            },
            ("Very touching and timeless.", 4),
        ),
    ];

    for (book, (content, rating)) in seeds {
        let created = books.add(book).await?;
        reviews
            .add(NewReview {
                content: content.to_string(),
                rating,
                date_created: OffsetDateTime::now_utc(),
                book_id: created.id,
                user_id: SEED_USER.to_string(),
            })
            .await?;
    }

    tracing::info!("seeded initial catalog");
    Ok(())
}
