//! Shared helpers for module tests.

use bookhub_kernel::ModuleRegistry;
use sqlx::SqlitePool;

/// In-memory pool with both modules' migrations applied, exactly the
/// way the application boots.
pub async fn test_pool() -> SqlitePool {
    let pool = bookhub_db::connect_in_memory()
        .await
        .expect("in-memory pool");

    let mut registry = ModuleRegistry::new();
    super::register_all(&mut registry, &pool);
    bookhub_db::run_migrations(&pool, &registry.collect_migrations())
        .await
        .expect("module migrations");

    pool
}
