//! SQLite pool construction and the migration runner for
//! module-contributed migrations.

use std::path::Path;

use bookhub_kernel::settings::DatabaseSettings;
use bookhub_kernel::Migration;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use thiserror::Error;

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("migration '{module}/{id}' failed: {source}")]
    Migration {
        module: String,
        id: String,
        #[source]
        source: sqlx::Error,
    },
}

/// Open (creating if missing) the SQLite database described by settings.
pub async fn connect(settings: &DatabaseSettings) -> Result<SqlitePool> {
    let db_path = Path::new(&settings.path);
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // mode=rwc creates the database file on first run.
    let db_url = format!("sqlite://{}?mode=rwc", settings.path);
    let pool = SqlitePoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(&db_url)
        .await?;

    if newly_created {
        tracing::info!(path = %settings.path, "initialized new database");
    } else {
        tracing::info!(path = %settings.path, "opened existing database");
    }

    configure(&pool).await?;

    Ok(pool)
}

/// Open an in-memory SQLite database. Used by tests and throwaway runs.
///
/// A single never-recycled connection: every pooled connection to
/// `:memory:` would otherwise see its own empty database.
pub async fn connect_in_memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    configure(&pool).await?;
    Ok(pool)
}

async fn configure(pool: &SqlitePool) -> Result<()> {
    // Cascade deletes rely on enforced foreign keys.
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    // WAL allows concurrent readers with one writer.
    sqlx::query("PRAGMA journal_mode = WAL").execute(pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(pool)
        .await?;

    Ok(())
}

/// Apply module-contributed migrations that have not run yet.
///
/// Applied migrations are recorded in `schema_migrations` keyed by
/// (module, id); re-running is a no-op for already-recorded entries.
pub async fn run_migrations(
    pool: &SqlitePool,
    migrations: &[(String, Migration)],
) -> Result<usize> {
    create_ledger_table(pool).await?;

    let mut applied = 0usize;

    for (module, migration) in migrations {
        let already_applied: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM schema_migrations WHERE module = ? AND id = ?)",
        )
        .bind(module)
        .bind(migration.id)
        .fetch_one(pool)
        .await?;

        if already_applied {
            continue;
        }

        tracing::info!(module = %module, id = migration.id, "applying migration");

        sqlx::raw_sql(migration.up)
            .execute(pool)
            .await
            .map_err(|source| DbError::Migration {
                module: module.clone(),
                id: migration.id.to_string(),
                source,
            })?;

        sqlx::query("INSERT INTO schema_migrations (module, id) VALUES (?, ?)")
            .bind(module)
            .bind(migration.id)
            .execute(pool)
            .await?;

        applied += 1;
    }

    if applied > 0 {
        tracing::info!(count = applied, "migrations applied");
    }

    Ok(applied)
}

async fn create_ledger_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            module TEXT NOT NULL,
            id TEXT NOT NULL,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (module, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
