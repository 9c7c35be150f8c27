//! bookhub Application Library
//!
//! This library provides the application modules and the bootstrap
//! flow wiring them to the kernel, store, and HTTP server.

pub mod modules;
pub mod seed;

use anyhow::Context;
use sqlx::SqlitePool;

use bookhub_kernel::settings::{Environment, Settings};
use bookhub_kernel::{InitCtx, ModuleRegistry};

/// Build the registry with every application module registered.
pub fn build_registry(pool: &SqlitePool) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, pool);
    registry
}

/// Open the store and bring the schema up to date.
pub async fn migrate(settings: &Settings) -> anyhow::Result<SqlitePool> {
    let pool = bookhub_db::connect(&settings.database)
        .await
        .context("failed to open database")?;

    let registry = build_registry(&pool);
    bookhub_db::run_migrations(&pool, &registry.collect_migrations())
        .await
        .context("failed to apply migrations")?;

    Ok(pool)
}

/// Full application bootstrap: store, modules, seed, HTTP server.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let pool = migrate(&settings).await?;
    let registry = build_registry(&pool);

    let ctx = InitCtx {
        settings: &settings,
        db: &pool,
    };
    registry.init_modules(&ctx).await?;

    if settings.environment == Environment::Local {
        seed::seed(&pool).await.context("failed to seed catalog")?;
    }

    registry.start_modules(&ctx).await?;

    bookhub_http::start_server(&registry, &settings).await?;

    registry.stop_modules().await?;

    Ok(())
}
