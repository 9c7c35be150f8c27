//! HTTP server facade for bookhub with Axum, error handling, and OpenAPI support.

use anyhow::Context;
use axum::{routing::get, Extension, Router};

use bookhub_kernel::ModuleRegistry;

pub mod error;
pub mod router;

use router::RouterBuilder;

/// Start the HTTP server with the given module registry
pub async fn start_server(
    registry: &ModuleRegistry,
    settings: &bookhub_kernel::settings::Settings,
) -> anyhow::Result<()> {
    tracing::info!(
        "starting HTTP server on {}:{}",
        settings.server.host,
        settings.server.port
    );

    let app = build_router(registry, settings);

    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", settings.server.host, settings.server.port))
            .await
            .context("failed to bind to address")?;

    tracing::info!(
        "HTTP server listening on http://{}:{}",
        settings.server.host,
        settings.server.port
    );

    axum::serve(listener, app)
        .await
        .context("HTTP server failed")?;

    Ok(())
}

/// Build the main HTTP router with all module routes mounted
pub fn build_router(
    registry: &ModuleRegistry,
    settings: &bookhub_kernel::settings::Settings,
) -> Router {
    let mut router_builder = RouterBuilder::new();

    // Add global middlewares
    router_builder = router_builder
        .with_tracing()
        .with_cors()
        .with_request_id()
        .with_timeout(settings.server.request_timeout_ms);

    // Add health check route
    router_builder = router_builder.route("/healthz", get(health_check));

    // Mount module routes: JSON API under /api/{name}, web under /{name}
    for module in registry.modules() {
        let module_name = module.name();

        tracing::info!(
            module = module_name,
            "mounting module routes under /api/{} and /{}",
            module_name,
            module_name
        );
        router_builder = router_builder
            .mount_api(module_name, module.api_routes())
            .mount_web(module_name, module.web_routes());
    }

    // Add OpenAPI documentation
    router_builder = router_builder.with_openapi(registry);

    // Identity extraction reads the configured principal header.
    router_builder
        .build()
        .layer(Extension(settings.auth.clone()))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
