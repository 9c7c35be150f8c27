pub mod books;
pub mod reviews;

#[cfg(test)]
pub(crate) mod test_support;

use bookhub_kernel::ModuleRegistry;
use sqlx::SqlitePool;

/// Register all application modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, pool: &SqlitePool) {
    registry.register(books::create_module(pool.clone()));
    registry.register(reviews::create_module(pool.clone()));
}
